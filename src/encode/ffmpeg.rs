use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::encode::session::{
    Container, EncoderBackend, EncoderConfig, EncoderSession, VideoCodec, VideoFrame,
};
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::backend::FrameRGBA;

/// The system `ffmpeg` binary and the encoders it was built with.
///
/// Serves as both the frame-exact encoder backend and the realtime recorder backend.
#[derive(Clone, Debug)]
pub struct FfmpegHost {
    binary: PathBuf,
    encoders: BTreeSet<String>,
    /// Background colour used to flatten alpha (RGBA8, straight alpha).
    bg_rgba: [u8; 4],
}

impl FfmpegHost {
    /// Probe `ffmpeg` on `PATH`. Returns `None` when it cannot be run.
    pub async fn probe() -> Option<Self> {
        Self::probe_binary("ffmpeg").await
    }

    /// Probe a specific `ffmpeg` binary.
    pub async fn probe_binary(binary: impl Into<PathBuf>) -> Option<Self> {
        let binary = binary.into();
        let output = Command::new(&binary)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await;
        match output {
            Ok(out) if out.status.success() => {
                let encoders = parse_encoder_list(&String::from_utf8_lossy(&out.stdout));
                tracing::debug!(
                    binary = %binary.display(),
                    encoders = encoders.len(),
                    "ffmpeg probed"
                );
                Some(Self::with_encoders(binary, encoders))
            }
            Ok(out) => {
                tracing::debug!(status = %out.status, "ffmpeg probe failed");
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "ffmpeg is not available");
                None
            }
        }
    }

    /// Build a host from a known encoder list without probing.
    pub fn with_encoders(binary: impl Into<PathBuf>, encoders: BTreeSet<String>) -> Self {
        Self {
            binary: binary.into(),
            encoders,
            bg_rgba: [0, 0, 0, 255],
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn has_encoder(&self, name: &str) -> bool {
        self.encoders.contains(name)
    }

    pub(crate) fn bg_rgba(&self) -> [u8; 4] {
        self.bg_rgba
    }
}

/// Parse the encoder names out of `ffmpeg -encoders` output.
pub fn parse_encoder_list(text: &str) -> BTreeSet<String> {
    text.lines()
        .skip_while(|l| !l.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|l| {
            let mut cols = l.split_whitespace();
            let flags = cols.next()?;
            let name = cols.next()?;
            (flags.len() == 6).then(|| name.to_string())
        })
        .collect()
}

/// `ffmpeg` encoder implementing `codec`.
pub fn encoder_name(codec: VideoCodec) -> &'static str {
    match codec {
        VideoCodec::Vp9 => "libvpx-vp9",
        VideoCodec::H264 => "libx264",
    }
}

/// What `ffmpeg` should write to stdout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct OutputSpec {
    pub encoder: &'static str,
    pub container: Container,
    pub bitrate_bps: u32,
    pub keyframe_interval: u32,
}

/// Arguments for raw RGBA frames on stdin and an encoded stream on stdout.
pub(crate) fn pipe_args(size: Canvas, fps: u32, out: OutputSpec) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(format!("{}x{}", size.width, size.height));
    // For rawvideo input, `-r` before `-i` sets the input frame rate.
    args.extend(["-r".to_string(), fps.to_string()]);
    args.extend(["-i", "pipe:0", "-an", "-c:v", out.encoder].map(String::from));

    match out.encoder {
        "libvpx-vp9" | "libvpx" => {
            args.extend(["-deadline", "realtime", "-cpu-used", "8"].map(String::from));
        }
        "libx264" => args.extend(["-preset", "veryfast"].map(String::from)),
        _ => {}
    }

    let kf = out.keyframe_interval.max(1);
    args.extend([
        "-b:v".to_string(),
        out.bitrate_bps.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-g".to_string(),
        kf.to_string(),
        "-force_key_frames".to_string(),
        format!("expr:eq(mod(n,{kf}),0)"),
    ]);

    match out.container {
        Container::WebM => args.extend(["-f", "webm"].map(String::from)),
        Container::Mp4 => {
            // stdout is not seekable, so the moov box must come first.
            args.extend(
                [
                    "-movflags",
                    "frag_keyframe+empty_moov+default_base_moof",
                    "-f",
                    "mp4",
                ]
                .map(String::from),
            );
        }
    }
    args.push("pipe:1".to_string());
    args
}

/// A running `ffmpeg` child with its output drained on background tasks.
pub(crate) struct FfmpegProcess {
    child: Child,
    stdout: JoinHandle<std::io::Result<Vec<u8>>>,
    stderr: JoinHandle<std::io::Result<Vec<u8>>>,
}

impl FfmpegProcess {
    pub(crate) fn spawn(binary: &Path, args: &[String]) -> Result<(Self, ChildStdin), String> {
        let mut child = Command::new(binary)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to spawn ffmpeg (is it installed and on PATH?): {e}"))?;

        let stdin = child
            .stdin
            .take()
            .ok_or("failed to open ffmpeg stdin (unexpected)")?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or("failed to open ffmpeg stdout (unexpected)")?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or("failed to open ffmpeg stderr (unexpected)")?;

        let stdout = tokio::spawn(async move {
            let mut bytes = Vec::new();
            stdout.read_to_end(&mut bytes).await?;
            Ok(bytes)
        });
        let stderr = tokio::spawn(async move {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes).await?;
            Ok(bytes)
        });

        Ok((
            Self {
                child,
                stdout,
                stderr,
            },
            stdin,
        ))
    }

    /// Wait for exit and return everything written to stdout.
    pub(crate) async fn wait(self) -> Result<Vec<u8>, String> {
        let Self {
            mut child,
            stdout,
            stderr,
        } = self;
        let (status, stdout, stderr) = futures::join!(child.wait(), stdout, stderr);

        let status = status.map_err(|e| format!("failed to wait for ffmpeg to finish: {e}"))?;
        if !status.success() {
            let stderr = stderr.ok().and_then(Result::ok).unwrap_or_default();
            let stderr = String::from_utf8_lossy(&stderr);
            let stderr = stderr.trim();
            return Err(if stderr.is_empty() {
                format!("ffmpeg exited with {status}")
            } else {
                format!("ffmpeg exited with {status}: {stderr}")
            });
        }
        stdout
            .map_err(|e| format!("ffmpeg stdout drain task failed: {e}"))?
            .map_err(|e| format!("ffmpeg stdout read failed: {e}"))
    }

    pub(crate) fn kill(&mut self) {
        let _ = self.child.start_kill();
        self.stdout.abort();
        self.stderr.abort();
    }
}

/// Flatten `frame` into `scratch` and write it to `stdin`.
pub(crate) async fn write_frame(
    stdin: &mut ChildStdin,
    scratch: &mut Vec<u8>,
    frame: &FrameRGBA,
    size: Canvas,
    bg_rgba: [u8; 4],
) -> Result<(), String> {
    if frame.size() != size {
        return Err(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width, frame.height, size.width, size.height
        ));
    }
    scratch.resize(size.rgba_len(), 0);
    flatten_to_opaque_rgba8(scratch, &frame.data, frame.premultiplied, bg_rgba)
        .map_err(|e| e.to_string())?;
    stdin
        .write_all(scratch)
        .await
        .map_err(|e| format!("failed to write frame to ffmpeg stdin: {e}"))
}

/// Composite RGBA8 over an opaque background; `ffmpeg` receives fully opaque pixels.
pub fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
) -> ReelResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(ReelError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let fg = if src_is_premul {
                u16::from(s[c])
            } else {
                mul_div255_u16(u16::from(s[c]), a)
            };
            d[c] = (fg + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

#[async_trait]
impl EncoderBackend for FfmpegHost {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn is_config_supported(&self, cfg: &EncoderConfig) -> bool {
        // yuv420p needs even dimensions.
        cfg.size.width.is_multiple_of(2)
            && cfg.size.height.is_multiple_of(2)
            && self.has_encoder(encoder_name(cfg.codec))
    }

    async fn open(&self, cfg: &EncoderConfig) -> ReelResult<Box<dyn EncoderSession>> {
        let out = OutputSpec {
            encoder: encoder_name(cfg.codec),
            container: cfg.codec.container(),
            bitrate_bps: cfg.bitrate_bps,
            keyframe_interval: cfg.keyframe_interval,
        };
        let args = pipe_args(cfg.size, cfg.fps, out);
        let (process, stdin) =
            FfmpegProcess::spawn(&self.binary, &args).map_err(ReelError::encode_failed)?;
        tracing::debug!(
            codec = ?cfg.codec,
            width = cfg.size.width,
            height = cfg.size.height,
            "ffmpeg encoder opened"
        );
        Ok(Box::new(FfmpegEncoderSession::start(
            process,
            stdin,
            cfg.size,
            self.bg_rgba,
        )))
    }
}

/// Frame-exact session: frames are queued to a writer task that feeds `ffmpeg` stdin.
pub struct FfmpegEncoderSession {
    frames: Option<mpsc::UnboundedSender<VideoFrame>>,
    pending_tx: Arc<watch::Sender<usize>>,
    pending_rx: watch::Receiver<usize>,
    failure: Arc<OnceLock<String>>,
    writer: Option<JoinHandle<()>>,
    process: Option<FfmpegProcess>,
    output: Option<Vec<u8>>,
}

impl FfmpegEncoderSession {
    fn start(process: FfmpegProcess, stdin: ChildStdin, size: Canvas, bg_rgba: [u8; 4]) -> Self {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (pending_tx, pending_rx) = watch::channel(0usize);
        let pending_tx = Arc::new(pending_tx);
        let failure = Arc::new(OnceLock::new());
        let writer = tokio::spawn(feed_frames(
            stdin,
            frames_rx,
            pending_tx.clone(),
            failure.clone(),
            size,
            bg_rgba,
        ));
        Self {
            frames: Some(frames_tx),
            pending_tx,
            pending_rx,
            failure,
            writer: Some(writer),
            process: Some(process),
            output: None,
        }
    }

    fn check_failure(&self) -> ReelResult<()> {
        match self.failure.get() {
            Some(msg) => Err(ReelError::encode_failed(msg.clone())),
            None => Ok(()),
        }
    }
}

async fn feed_frames(
    mut stdin: ChildStdin,
    mut frames: mpsc::UnboundedReceiver<VideoFrame>,
    pending: Arc<watch::Sender<usize>>,
    failure: Arc<OnceLock<String>>,
    size: Canvas,
    bg_rgba: [u8; 4],
) {
    let mut scratch = Vec::new();
    while let Some(frame) = frames.recv().await {
        let res = write_frame(&mut stdin, &mut scratch, &frame.image, size, bg_rgba).await;
        drop(frame);
        pending.send_modify(|n| *n = n.saturating_sub(1));
        if let Err(msg) = res {
            let _ = failure.set(msg);
            return;
        }
    }
    if let Err(e) = stdin.shutdown().await {
        let _ = failure.set(format!("failed to close ffmpeg stdin: {e}"));
    }
}

#[async_trait]
impl EncoderSession for FfmpegEncoderSession {
    fn encode(&mut self, frame: VideoFrame) -> ReelResult<()> {
        self.check_failure()?;
        let Some(tx) = self.frames.as_ref() else {
            return Err(ReelError::encode_failed(
                "encoder session is already flushed or closed",
            ));
        };
        self.pending_tx.send_modify(|n| *n += 1);
        if tx.send(frame).is_err() {
            self.pending_tx.send_modify(|n| *n = n.saturating_sub(1));
            return Err(ReelError::encode_failed("ffmpeg writer task stopped"));
        }
        Ok(())
    }

    fn queue_size(&self) -> usize {
        *self.pending_rx.borrow()
    }

    async fn drained(&mut self, threshold: usize) {
        loop {
            let pending = *self.pending_rx.borrow_and_update();
            if pending <= threshold {
                return;
            }
            if self.pending_rx.changed().await.is_err() {
                return;
            }
        }
    }

    async fn flush(&mut self) -> ReelResult<()> {
        // Closing the queue lets the writer drain it and then close stdin.
        self.frames = None;
        if let Some(writer) = self.writer.take() {
            writer
                .await
                .map_err(|e| ReelError::encode_failed(format!("ffmpeg writer task failed: {e}")))?;
        }
        let process = self
            .process
            .take()
            .ok_or_else(|| ReelError::encode_failed("encoder session already flushed"))?;
        if let Err(write_failure) = self.check_failure() {
            // A failed write usually means ffmpeg exited; its own message names the cause.
            return Err(match process.wait().await {
                Err(exit) => ReelError::encode_failed(exit),
                Ok(_) => write_failure,
            });
        }
        let bytes = process.wait().await.map_err(ReelError::encode_failed)?;
        self.output = Some(bytes);
        Ok(())
    }

    async fn finish(self: Box<Self>) -> ReelResult<Vec<u8>> {
        let mut this = self;
        this.output
            .take()
            .ok_or_else(|| ReelError::encode_failed("encoder session finished before flush"))
    }

    fn close(&mut self) {
        self.frames = None;
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
        if let Some(mut process) = self.process.take() {
            process.kill();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
