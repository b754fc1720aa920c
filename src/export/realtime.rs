use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::encode::recorder::{RecorderBackend, SurfaceTap, pick_mime_type};
use crate::export::config::ExportConfig;
use crate::export::{
    ExportResult, ProgressSink, Tier, TierFailure, artifact_file_name, chain_warning,
    render_frame_at,
};
use crate::foundation::core::ExportProgress;
use crate::foundation::error::ReelResult;
use crate::render::backend::ExportRenderer;
use crate::route::sampler::total_frames;

/// Warning attached to every realtime recording.
pub const REALTIME_WARNING: &str = "Exported with the realtime recording fallback. The video may \
     not be frame-perfect and its smoothness depends on host performance.";

/// File extension for a recorder MIME type.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    if mime_type.trim_start().starts_with("video/mp4") {
        "mp4"
    } else {
        "webm"
    }
}

/// Tier B: play the animation in real time while the recorder samples the surface.
pub(crate) async fn run(
    renderer: &mut dyn ExportRenderer,
    backend: &dyn RecorderBackend,
    cfg: &ExportConfig,
    duration_secs: f64,
    on_progress: &mut ProgressSink<'_>,
    cancel: &CancellationToken,
    upstream: &[TierFailure],
) -> ReelResult<ExportResult> {
    let size = cfg.canvas()?;
    let (tap, stream) = SurfaceTap::open(size, cfg.fps);
    let preferred = pick_mime_type(backend, &cfg.recorder_mime_types);
    if preferred.is_none() {
        tracing::debug!(
            backend = backend.name(),
            "no preferred MIME type supported; using recorder default"
        );
    }
    let recording = backend.start(stream, preferred).await?;
    let mime_type = recording.mime_type().to_string();
    tracing::info!(mime_type = %mime_type, backend = backend.name(), "realtime recording started");

    let total = total_frames(duration_secs, cfg.fps);
    let frame_period = Duration::from_secs_f64(1.0 / f64::from(cfg.fps));
    for i in 0..total {
        render_frame_at(renderer, i, total, cancel)?;
        tap.publish(renderer.canvas()?);
        on_progress(ExportProgress {
            frame: i + 1,
            total_frames: total,
        });
        tokio::time::sleep(frame_period).await;
    }

    let bytes = recording.stop().await?;
    tap.stop_tracks();
    tracing::info!(
        frames = total,
        bytes = bytes.len(),
        "realtime recording finished"
    );

    Ok(ExportResult {
        bytes,
        file_name: artifact_file_name(
            &cfg.file_stem,
            "fallback",
            extension_for_mime(&mime_type),
        ),
        mime_type,
        tier: Tier::Realtime,
        warning: Some(chain_warning(REALTIME_WARNING.to_string(), upstream)),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/export/realtime.rs"]
mod tests;
