use tokio_util::sync::CancellationToken;

use crate::encode::archive::FrameArchive;
use crate::export::config::ExportConfig;
use crate::export::{
    ExportResult, ProgressSink, Tier, TierFailure, artifact_file_name, chain_warning,
    render_frame_at,
};
use crate::foundation::core::ExportProgress;
use crate::foundation::error::ReelResult;
use crate::render::backend::ExportRenderer;
use crate::route::sampler::total_frames;

/// Whether frame `index` of `total_frames` goes into the archive.
pub fn is_captured(index: u64, total_frames: u64, stride: u64) -> bool {
    index.is_multiple_of(stride.max(1)) || index + 1 == total_frames
}

/// Number of stills an archive of `total_frames` frames holds.
pub fn captured_count(total_frames: u64, stride: u64) -> u64 {
    (0..total_frames)
        .filter(|&i| is_captured(i, total_frames, stride))
        .count() as u64
}

/// Tier C: a ZIP of PNG stills sampled along the route.
pub(crate) async fn run(
    renderer: &mut dyn ExportRenderer,
    cfg: &ExportConfig,
    duration_secs: f64,
    on_progress: &mut ProgressSink<'_>,
    cancel: &CancellationToken,
    upstream: &[TierFailure],
) -> ReelResult<ExportResult> {
    let total = total_frames(duration_secs, cfg.fps);
    let mut archive = FrameArchive::new();
    tracing::info!(
        frames = total,
        stride = cfg.archive_stride,
        stills = captured_count(total, cfg.archive_stride),
        "still archive started"
    );

    for i in 0..total {
        render_frame_at(renderer, i, total, cancel)?;
        if is_captured(i, total, cfg.archive_stride) {
            let name = archive.push_frame(renderer.canvas()?)?;
            tracing::trace!(frame = i, entry = %name, "still captured");
            // PNG encoding is heavy; let other tasks run between stills.
            tokio::task::yield_now().await;
        }
        on_progress(ExportProgress {
            frame: i + 1,
            total_frames: total,
        });
    }

    let stills = archive.len();
    let bytes = archive.finish()?;
    tracing::info!(stills, bytes = bytes.len(), "still archive finished");

    let warning = format!(
        "Exported {stills} still frames as a ZIP archive. \
         This is a sparse frame sequence, not a video."
    );
    Ok(ExportResult {
        bytes,
        file_name: artifact_file_name(&cfg.file_stem, "frames", "zip"),
        mime_type: "application/zip".to_string(),
        tier: Tier::StillArchive,
        warning: Some(chain_warning(warning, upstream)),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/export/still_archive.rs"]
mod tests;
