use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::encode::session::{
    EncoderBackend, EncoderConfig, ScopedSession, VideoFrame, frame_duration_us,
    frame_timestamp_us,
};
use crate::export::config::ExportConfig;
use crate::export::{
    ExportResult, ProgressSink, Tier, artifact_file_name, render_frame_at, resolution_tag,
};
use crate::foundation::core::ExportProgress;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::ExportRenderer;
use crate::route::sampler::total_frames;

/// First codec in the preference list the backend accepts at the configured size and rate.
pub async fn select_codec(
    backend: &dyn EncoderBackend,
    cfg: &ExportConfig,
) -> ReelResult<EncoderConfig> {
    let size = cfg.canvas()?;
    for choice in &cfg.codecs {
        let candidate = EncoderConfig {
            codec: choice.codec,
            size,
            fps: cfg.fps,
            bitrate_bps: choice.bitrate_bps,
            keyframe_interval: cfg.keyframe_interval,
        };
        if backend.is_config_supported(&candidate).await {
            return Ok(candidate);
        }
        tracing::debug!(codec = ?choice.codec, backend = backend.name(), "codec not supported");
    }
    Err(ReelError::no_supported_codec(format!(
        "{} supports none of the configured codecs at {}x{}@{}",
        backend.name(),
        size.width,
        size.height,
        cfg.fps
    )))
}

/// Wait until at most `threshold` frames are pending, giving up after `wait`.
///
/// Returns `false` when the wait timed out.
pub async fn wait_for_drain(
    session: &mut ScopedSession,
    threshold: usize,
    wait: Duration,
) -> bool {
    if session.queue_size() <= threshold {
        return true;
    }
    match tokio::time::timeout(wait, session.drained(threshold)).await {
        Ok(()) => true,
        Err(_) => {
            tracing::debug!(
                pending = session.queue_size(),
                threshold,
                "encoder did not drain in time; continuing"
            );
            false
        }
    }
}

/// Flush a session whose `encode` failed; a flush error usually names the underlying cause.
async fn failure_cause(session: &mut ScopedSession, err: ReelError, wait: Duration) -> ReelError {
    match tokio::time::timeout(wait, session.flush()).await {
        Ok(Err(cause @ ReelError::EncodeFailed(_))) => cause,
        _ => err,
    }
}

/// Tier A: encode every frame with exact timestamps.
pub(crate) async fn run(
    renderer: &mut dyn ExportRenderer,
    backend: &dyn EncoderBackend,
    cfg: &ExportConfig,
    duration_secs: f64,
    on_progress: &mut ProgressSink<'_>,
    cancel: &CancellationToken,
) -> ReelResult<ExportResult> {
    let enc = select_codec(backend, cfg).await?;
    let mut session = ScopedSession::new(backend.open(&enc).await?);
    tracing::info!(codec = ?enc.codec, backend = backend.name(), "frame-exact encode started");

    let total = total_frames(duration_secs, cfg.fps);
    let drain_wait = Duration::from_millis(cfg.drain_wait_ms);
    let duration_us = frame_duration_us(cfg.fps);

    for i in 0..total {
        render_frame_at(renderer, i, total, cancel)?;
        let image = renderer.canvas()?.clone();
        let queued = session.encode(VideoFrame {
            index: i,
            timestamp_us: frame_timestamp_us(i, cfg.fps),
            duration_us,
            keyframe: i % u64::from(cfg.keyframe_interval) == 0,
            image,
        });
        if let Err(err) = queued {
            return Err(failure_cause(&mut session, err, drain_wait).await);
        }

        if session.queue_size() > cfg.backpressure_threshold {
            wait_for_drain(&mut session, cfg.backpressure_threshold, drain_wait).await;
        }

        on_progress(ExportProgress {
            frame: i + 1,
            total_frames: total,
        });

        if (i + 1) % cfg.yield_every == 0 {
            tokio::task::yield_now().await;
        }
    }

    let flush_started = Instant::now();
    let flush_timeout = Duration::from_millis(cfg.flush_timeout_ms);
    tokio::time::timeout(flush_timeout, session.flush())
        .await
        .map_err(|_| {
            ReelError::encode_failed(format!(
                "encoder flush timed out after {} ms",
                cfg.flush_timeout_ms
            ))
        })??;
    let bytes = session.finish().await?;
    tracing::info!(
        frames = total,
        bytes = bytes.len(),
        flush_ms = flush_started.elapsed().as_millis() as u64,
        "frame-exact encode finished"
    );

    let container = enc.codec.container();
    Ok(ExportResult {
        bytes,
        file_name: artifact_file_name(
            &cfg.file_stem,
            &resolution_tag(enc.size),
            container.extension(),
        ),
        mime_type: container.mime_type().to_string(),
        tier: Tier::FrameExact,
        warning: None,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/export/frame_exact.rs"]
mod tests;
