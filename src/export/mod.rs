//! Tiered export of the route animation.
//!
//! [`Exporter`](orchestrator::Exporter) drives the renderer frame by frame through the best
//! strategy the host offers and cascades to weaker ones on recoverable failures:
//!
//! - [`Tier::FrameExact`]: every frame encoded with exact timestamps.
//! - [`Tier::Realtime`]: the surface is recorded live while the animation plays.
//! - [`Tier::StillArchive`]: a ZIP of PNG stills sampled along the route.

pub mod config;
pub mod frame_exact;
pub mod host;
pub mod lease;
pub mod orchestrator;
pub mod realtime;
pub mod still_archive;

use tokio_util::sync::CancellationToken;

use crate::foundation::core::{Canvas, ExportProgress};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::ExportRenderer;
use crate::route::sampler::frame_progress;

/// Export strategy, ordered from most to least faithful.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Tier A: frame-exact encode.
    FrameExact,
    /// Tier B: realtime capture-record.
    Realtime,
    /// Tier C: still-image archive.
    StillArchive,
}

impl Tier {
    /// Single-letter tier name used in logs and warnings.
    pub fn letter(self) -> char {
        match self {
            Self::FrameExact => 'A',
            Self::Realtime => 'B',
            Self::StillArchive => 'C',
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::FrameExact => "frame-exact encode",
            Self::Realtime => "realtime recording",
            Self::StillArchive => "still archive",
        };
        write!(f, "{name} ({})", self.letter())
    }
}

/// The artifact of a successful export. Ownership of the bytes passes to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportResult {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub tier: Tier,
    /// Set whenever the artifact is degraded relative to a frame-exact video.
    pub warning: Option<String>,
}

/// A tier that failed with a cascading error before the current one ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierFailure {
    pub tier: Tier,
    pub reason: String,
}

/// Per-frame progress callback as seen by the tiers.
pub(crate) type ProgressSink<'a> = dyn FnMut(ExportProgress) + Send + 'a;

/// `<stem>-<tag>-<unix_ms>.<ext>`
pub(crate) fn artifact_file_name(stem: &str, tag: &str, ext: &str) -> String {
    format!(
        "{stem}-{tag}-{}.{ext}",
        chrono::Utc::now().timestamp_millis()
    )
}

/// Short resolution label for file names: `4k` for UHD and up, otherwise `<height>p`.
pub(crate) fn resolution_tag(size: Canvas) -> String {
    if size.width >= 3840 && size.height >= 2160 {
        "4k".to_string()
    } else {
        format!("{}p", size.height)
    }
}

/// Append the reasons earlier tiers failed to a warning.
pub(crate) fn chain_warning(mut warning: String, upstream: &[TierFailure]) -> String {
    for failure in upstream {
        warning.push_str(&format!(
            " Tier {} failed: {}.",
            failure.tier.letter(),
            failure.reason
        ));
    }
    warning
}

/// Drive the renderer to frame `index` of `total_frames`.
///
/// Cancellation is observed here, before the renderer is touched.
pub(crate) fn render_frame_at(
    renderer: &mut dyn ExportRenderer,
    index: u64,
    total_frames: u64,
    cancel: &CancellationToken,
) -> ReelResult<()> {
    if cancel.is_cancelled() {
        return Err(ReelError::Cancelled);
    }
    renderer.set_progress(frame_progress(index, total_frames));
    renderer.render_frame();
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/export/stub.rs"]
pub(crate) mod stub;

#[cfg(test)]
#[path = "../../tests/unit/export/mod.rs"]
mod tests;
