#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use routereel::{
    CaptureStream, Canvas, EncoderBackend, EncoderConfig, EncoderSession, ExportRenderer,
    FrameRGBA, Progress, RecorderBackend, RecordingSession, ReelError, ReelResult, VideoCodec,
    VideoFrame,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    SetRenderSize(u32, u32),
    Restore,
    SetProgress(f64),
    Render,
}

/// Renderer that logs every call and paints progress into the red channel.
pub struct CountingRenderer {
    pub calls: Vec<Call>,
    pub display: Canvas,
    pub size: Canvas,
    snapshot: Option<Canvas>,
    progress: Progress,
    frame: Option<FrameRGBA>,
    /// Simulate a renderer that never finishes initializing.
    pub never_ready: bool,
}

impl CountingRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        let display = Canvas::new(width, height).unwrap();
        Self {
            calls: Vec::new(),
            display,
            size: display,
            snapshot: None,
            progress: Progress::START,
            frame: None,
            never_ready: false,
        }
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    /// The renderer ended the run restored, rewound and redrawn.
    pub fn assert_restored(&self) {
        assert_eq!(self.size, self.display, "surface size was not restored");
        assert_eq!(
            self.count(&Call::Restore),
            1,
            "restore must run exactly once"
        );
        assert_eq!(
            self.calls[self.calls.len() - 3..],
            [Call::Restore, Call::SetProgress(0.0), Call::Render]
        );
    }
}

impl ExportRenderer for CountingRenderer {
    fn set_render_size(&mut self, width: u32, height: u32) {
        self.calls.push(Call::SetRenderSize(width, height));
        if self.snapshot.is_none() {
            self.snapshot = Some(self.size);
        }
        self.size = Canvas::new(width, height).unwrap();
    }

    fn restore_render_size(&mut self) {
        self.calls.push(Call::Restore);
        if let Some(size) = self.snapshot.take() {
            self.size = size;
        }
    }

    fn set_progress(&mut self, progress: Progress) {
        self.calls.push(Call::SetProgress(progress.get()));
        self.progress = progress;
    }

    fn render_frame(&mut self) {
        self.calls.push(Call::Render);
        let shade = (self.progress.get() * 255.0).round() as u8;
        self.frame = Some(FrameRGBA::solid(self.size, [shade, 0, 0, 255]));
    }

    fn canvas(&self) -> ReelResult<&FrameRGBA> {
        if self.never_ready {
            return Err(ReelError::renderer_not_ready("context lost"));
        }
        self.frame
            .as_ref()
            .ok_or_else(|| ReelError::renderer_not_ready("nothing rendered yet"))
    }
}

/// Encoder supporting a fixed codec set, optionally failing after some frames.
#[derive(Default)]
pub struct FakeEncoder {
    pub supported: Vec<VideoCodec>,
    pub fail_after: Option<u64>,
    pub frames: Arc<Mutex<Vec<VideoFrame>>>,
}

impl FakeEncoder {
    pub fn supporting(supported: &[VideoCodec]) -> Self {
        Self {
            supported: supported.to_vec(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl EncoderBackend for FakeEncoder {
    fn name(&self) -> &str {
        "fake-encoder"
    }

    async fn is_config_supported(&self, cfg: &EncoderConfig) -> bool {
        self.supported.contains(&cfg.codec)
    }

    async fn open(&self, _cfg: &EncoderConfig) -> ReelResult<Box<dyn EncoderSession>> {
        Ok(Box::new(FakeSession {
            fail_after: self.fail_after,
            frames: self.frames.clone(),
            closed: false,
        }))
    }
}

struct FakeSession {
    fail_after: Option<u64>,
    frames: Arc<Mutex<Vec<VideoFrame>>>,
    closed: bool,
}

#[async_trait]
impl EncoderSession for FakeSession {
    fn encode(&mut self, frame: VideoFrame) -> ReelResult<()> {
        if self.fail_after.is_some_and(|n| frame.index >= n) {
            return Err(ReelError::encode_failed("hardware encoder reset"));
        }
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }

    fn queue_size(&self) -> usize {
        0
    }

    async fn drained(&mut self, _threshold: usize) {}

    async fn flush(&mut self) -> ReelResult<()> {
        Ok(())
    }

    async fn finish(self: Box<Self>) -> ReelResult<Vec<u8>> {
        Ok(b"\x1a\x45\xdf\xa3fake-webm".to_vec())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Recorder that samples the capture stream once at stop time.
#[derive(Default)]
pub struct FakeRecorder {
    pub supported: Vec<String>,
    pub fail_on_stop: bool,
    /// MIME type requested by the last `start`.
    pub requested: Arc<Mutex<Option<Option<String>>>>,
}

impl FakeRecorder {
    pub fn webm() -> Self {
        Self {
            supported: vec!["video/webm;codecs=vp8".to_string(), "video/webm".to_string()],
            ..Self::default()
        }
    }
}

#[async_trait]
impl RecorderBackend for FakeRecorder {
    fn name(&self) -> &str {
        "fake-recorder"
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|m| m == mime_type)
    }

    async fn start(
        &self,
        stream: CaptureStream,
        mime_type: Option<&str>,
    ) -> ReelResult<Box<dyn RecordingSession>> {
        *self.requested.lock().unwrap() = Some(mime_type.map(str::to_string));
        Ok(Box::new(FakeRecording {
            stream,
            mime_type: mime_type.unwrap_or("video/webm").to_string(),
            fail_on_stop: self.fail_on_stop,
        }))
    }
}

struct FakeRecording {
    stream: CaptureStream,
    mime_type: String,
    fail_on_stop: bool,
}

#[async_trait]
impl RecordingSession for FakeRecording {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    async fn stop(self: Box<Self>) -> ReelResult<Vec<u8>> {
        if self.fail_on_stop {
            return Err(ReelError::record_failed("recorder crashed"));
        }
        let last = self
            .stream
            .latest()
            .ok_or_else(|| ReelError::record_failed("nothing captured"))?;
        Ok(last.data.clone())
    }
}
