//! Routereel renders an animated travel route on a globe and exports it as a video.
//!
//! The export runs the renderer frame by frame through the best strategy the host supports:
//!
//! - frame-exact encoding through `ffmpeg`
//! - realtime recording of the rendered surface
//! - a ZIP archive of PNG stills
//!
//! Start with [`Exporter`] and an [`ExportHost`]; [`GlobeRenderer`] is the bundled CPU renderer.
#![forbid(unsafe_code)]

mod foundation;

/// Encoder, recorder and archive primitives used by the export tiers.
pub mod encode;
/// Tiered export orchestration.
pub mod export;
/// Renderer contract and the CPU globe renderer.
pub mod render;
/// Route geometry and progress sampling.
pub mod route;

pub use crate::foundation::core::{Canvas, ExportProgress, Progress};
pub use crate::foundation::error::{ReelError, ReelResult};
pub use crate::foundation::math::Vec3;

pub use crate::encode::ffmpeg::FfmpegHost;
pub use crate::encode::recorder::{CaptureStream, RecorderBackend, RecordingSession, SurfaceTap};
pub use crate::encode::session::{
    CodecChoice, Container, EncoderBackend, EncoderConfig, EncoderSession, VideoCodec, VideoFrame,
};
pub use crate::export::config::{CascadePolicy, ExportConfig};
pub use crate::export::host::ExportHost;
pub use crate::export::orchestrator::{ExportStage, Exporter};
pub use crate::export::{ExportResult, Tier};
pub use crate::render::backend::{ExportRenderer, FrameRGBA};
pub use crate::render::cpu::{GlobeRenderer, GlobeRendererOpts};
pub use crate::route::geo::{GeoPoint, RoutePoint, RouteSettings, great_circle_arc};
pub use crate::route::sampler::{Lerp, current_position, total_frames, visible_prefix};
