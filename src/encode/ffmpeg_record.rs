use std::time::Duration;

use async_trait::async_trait;
use tokio::process::ChildStdin;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::encode::ffmpeg::{FfmpegHost, FfmpegProcess, OutputSpec, pipe_args, write_frame};
use crate::encode::recorder::{CaptureStream, RecorderBackend, RecordingSession};
use crate::encode::session::Container;
use crate::foundation::error::{ReelError, ReelResult};

/// Bitrate of realtime recordings.
pub const RECORD_BITRATE_BPS: u32 = 8_000_000;

impl FfmpegHost {
    /// `ffmpeg` encoder and container used to record `mime_type`, if this host can.
    pub fn recorder_output(&self, mime_type: &str) -> Option<(&'static str, Container)> {
        let normalized: String = mime_type
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        let (encoder, container) = match normalized.as_str() {
            "video/webm;codecs=vp9" => ("libvpx-vp9", Container::WebM),
            "video/webm;codecs=vp8" => ("libvpx", Container::WebM),
            "video/webm" => {
                let encoder = ["libvpx-vp9", "libvpx"]
                    .into_iter()
                    .find(|e| self.has_encoder(e))?;
                (encoder, Container::WebM)
            }
            "video/mp4" => ("libx264", Container::Mp4),
            _ => return None,
        };
        self.has_encoder(encoder).then_some((encoder, container))
    }
}

#[async_trait]
impl RecorderBackend for FfmpegHost {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.recorder_output(mime_type).is_some()
    }

    async fn start(
        &self,
        stream: CaptureStream,
        mime_type: Option<&str>,
    ) -> ReelResult<Box<dyn RecordingSession>> {
        let mime_type = match mime_type {
            Some(m) => m,
            None => ["video/webm", "video/mp4"]
                .into_iter()
                .find(|m| self.is_type_supported(m))
                .unwrap_or("video/webm"),
        };
        let (encoder, container) = self.recorder_output(mime_type).ok_or_else(|| {
            ReelError::record_failed(format!("ffmpeg cannot record '{mime_type}'"))
        })?;

        let fps = stream.fps().max(1);
        let out = OutputSpec {
            encoder,
            container,
            bitrate_bps: RECORD_BITRATE_BPS,
            keyframe_interval: fps,
        };
        let args = pipe_args(stream.size(), fps, out);
        let (process, stdin) =
            FfmpegProcess::spawn(self.binary(), &args).map_err(ReelError::record_failed)?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let sampler = tokio::spawn(sample_stream(stream, stdin, stop_rx, self.bg_rgba()));
        tracing::debug!(mime_type, encoder, "ffmpeg recording started");

        Ok(Box::new(FfmpegRecording {
            mime_type: if mime_type == "video/webm" || container == Container::Mp4 {
                container.mime_type().to_string()
            } else {
                mime_type.to_string()
            },
            stop: Some(stop_tx),
            sampler,
            process,
        }))
    }
}

/// Why sampling ended without a complete input stream.
#[derive(Debug)]
enum SampleError {
    NothingCaptured,
    Write(String),
}

/// Samples the latest published surface on a fixed clock until stopped.
async fn sample_stream(
    stream: CaptureStream,
    mut stdin: ChildStdin,
    mut stop: oneshot::Receiver<()>,
    bg_rgba: [u8; 4],
) -> Result<u64, SampleError> {
    let period = Duration::from_secs_f64(1.0 / f64::from(stream.fps().max(1)));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let size = stream.size();
    let mut scratch = Vec::new();
    let mut written = 0u64;
    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {
                if let Some(frame) = stream.latest() {
                    write_frame(&mut stdin, &mut scratch, &frame, size, bg_rgba)
                        .await
                        .map_err(SampleError::Write)?;
                    written += 1;
                }
            }
        }
    }

    // A recording stopped before its first tick still gets the final surface.
    if written == 0
        && let Some(frame) = stream.latest()
    {
        write_frame(&mut stdin, &mut scratch, &frame, size, bg_rgba)
            .await
            .map_err(SampleError::Write)?;
        written += 1;
    }
    if written == 0 {
        return Err(SampleError::NothingCaptured);
    }
    drop(stdin);
    Ok(written)
}

/// A realtime recording fed by [`sample_stream`].
pub struct FfmpegRecording {
    mime_type: String,
    stop: Option<oneshot::Sender<()>>,
    sampler: JoinHandle<Result<u64, SampleError>>,
    process: FfmpegProcess,
}

#[async_trait]
impl RecordingSession for FfmpegRecording {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    async fn stop(self: Box<Self>) -> ReelResult<Vec<u8>> {
        let Self {
            stop,
            sampler,
            mut process,
            ..
        } = *self;
        if let Some(stop) = stop {
            let _ = stop.send(());
        }

        let sampled = sampler
            .await
            .map_err(|e| ReelError::record_failed(format!("recording task failed: {e}")));
        let frames = match sampled {
            Ok(Ok(frames)) => frames,
            Ok(Err(SampleError::NothingCaptured)) => {
                process.kill();
                return Err(ReelError::record_failed("no frames were captured"));
            }
            Ok(Err(SampleError::Write(msg))) => {
                // stdin is closed by now; a crashed ffmpeg explains itself on stderr.
                return Err(ReelError::record_failed(match process.wait().await {
                    Err(exit) => exit,
                    Ok(_) => msg,
                }));
            }
            Err(e) => {
                process.kill();
                return Err(e);
            }
        };

        let bytes = process.wait().await.map_err(ReelError::record_failed)?;
        tracing::debug!(frames, bytes = bytes.len(), "ffmpeg recording stopped");
        Ok(bytes)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg_record.rs"]
mod tests;
