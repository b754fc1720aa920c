use async_trait::async_trait;

use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::FrameRGBA;

/// Output container of an encoded video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Container {
    WebM,
    Mp4,
}

impl Container {
    pub fn extension(self) -> &'static str {
        match self {
            Self::WebM => "webm",
            Self::Mp4 => "mp4",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::WebM => "video/webm",
            Self::Mp4 => "video/mp4",
        }
    }
}

/// Video codecs the frame-exact tier knows how to request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    Vp9,
    H264,
}

impl VideoCodec {
    /// RFC 6381 style codec string.
    pub fn codec_string(self) -> &'static str {
        match self {
            Self::Vp9 => "vp09.00.10.08",
            Self::H264 => "avc1.640033",
        }
    }

    pub fn container(self) -> Container {
        match self {
            Self::Vp9 => Container::WebM,
            Self::H264 => Container::Mp4,
        }
    }
}

/// One entry of the codec preference list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CodecChoice {
    pub codec: VideoCodec,
    pub bitrate_bps: u32,
}

/// Full configuration handed to an [`EncoderBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    pub codec: VideoCodec,
    pub size: Canvas,
    pub fps: u32,
    pub bitrate_bps: u32,
    /// Distance between forced keyframes, in frames.
    pub keyframe_interval: u32,
}

/// A timestamped frame unit submitted to an encoder session.
///
/// Submitting moves the pixels into the session, which drops them once written.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub index: u64,
    pub timestamp_us: u64,
    pub duration_us: u64,
    pub keyframe: bool,
    pub image: FrameRGBA,
}

/// Presentation timestamp of frame `index`: `round(index / fps * 1e6)`.
pub fn frame_timestamp_us(index: u64, fps: u32) -> u64 {
    (index as f64 / f64::from(fps.max(1)) * 1_000_000.0).round() as u64
}

/// Duration of one frame: `round(1 / fps * 1e6)`.
pub fn frame_duration_us(fps: u32) -> u64 {
    (1_000_000.0 / f64::from(fps.max(1))).round() as u64
}

/// Host facility able to open frame-exact encoding sessions.
#[async_trait]
pub trait EncoderBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn is_config_supported(&self, cfg: &EncoderConfig) -> bool;

    async fn open(&self, cfg: &EncoderConfig) -> ReelResult<Box<dyn EncoderSession>>;
}

/// A configured encoding session.
///
/// Lifecycle: `encode`* -> `flush` -> `finish`. `close` releases resources and may be called at
/// any point, any number of times. Asynchronous failures surface from the next `encode` or from
/// `flush` as [`ReelError::EncodeFailed`].
#[async_trait]
pub trait EncoderSession: Send {
    /// Queue one frame for encoding.
    fn encode(&mut self, frame: VideoFrame) -> ReelResult<()>;

    /// Frames submitted but not yet consumed by the encoder.
    fn queue_size(&self) -> usize;

    /// Resolve once `queue_size() <= threshold`.
    async fn drained(&mut self, threshold: usize);

    /// Wait until every queued frame has been encoded.
    async fn flush(&mut self) -> ReelResult<()>;

    /// Finalize the container and return its bytes.
    async fn finish(self: Box<Self>) -> ReelResult<Vec<u8>>;

    fn close(&mut self);
}

/// Owns an [`EncoderSession`] and closes it on every exit path that does not finish it.
pub struct ScopedSession {
    inner: Option<Box<dyn EncoderSession>>,
}

impl ScopedSession {
    pub fn new(session: Box<dyn EncoderSession>) -> Self {
        Self {
            inner: Some(session),
        }
    }

    fn session(&mut self) -> ReelResult<&mut Box<dyn EncoderSession>> {
        self.inner
            .as_mut()
            .ok_or_else(|| ReelError::encode_failed("encoder session already finished"))
    }

    pub fn encode(&mut self, frame: VideoFrame) -> ReelResult<()> {
        self.session()?.encode(frame)
    }

    pub fn queue_size(&self) -> usize {
        self.inner.as_ref().map_or(0, |s| s.queue_size())
    }

    pub async fn drained(&mut self, threshold: usize) {
        if let Some(s) = self.inner.as_mut() {
            s.drained(threshold).await;
        }
    }

    pub async fn flush(&mut self) -> ReelResult<()> {
        self.session()?.flush().await
    }

    pub async fn finish(mut self) -> ReelResult<Vec<u8>> {
        let session = self
            .inner
            .take()
            .ok_or_else(|| ReelError::encode_failed("encoder session already finished"))?;
        session.finish().await
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        if let Some(mut s) = self.inner.take() {
            s.close();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/session.rs"]
mod tests;
