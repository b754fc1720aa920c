use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::foundation::core::Canvas;
use crate::foundation::error::ReelResult;
use crate::render::backend::FrameRGBA;

/// MIME types tried in order when choosing a recording format.
pub const DEFAULT_RECORDER_MIME_TYPES: [&str; 3] = [
    "video/webm;codecs=vp9",
    "video/webm;codecs=vp8",
    "video/webm",
];

/// Producer side of a live capture stream over a renderer surface.
///
/// The export loop publishes every freshly rendered surface; a recorder samples the latest one
/// on its own clock.
#[derive(Debug)]
pub struct SurfaceTap {
    tx: watch::Sender<Option<Arc<FrameRGBA>>>,
}

/// Consumer side of a [`SurfaceTap`].
#[derive(Clone, Debug)]
pub struct CaptureStream {
    rx: watch::Receiver<Option<Arc<FrameRGBA>>>,
    fps: u32,
    size: Canvas,
}

impl SurfaceTap {
    /// Open a capture stream of `size` pixels sampled at `fps`.
    pub fn open(size: Canvas, fps: u32) -> (Self, CaptureStream) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, CaptureStream { rx, fps, size })
    }

    /// Make `frame` the surface content recorders see from now on.
    pub fn publish(&self, frame: &FrameRGBA) {
        self.tx.send_replace(Some(Arc::new(frame.clone())));
    }

    /// End the stream; recorders keep the last frame but see no further updates.
    pub fn stop_tracks(self) {
        drop(self.tx);
    }
}

impl CaptureStream {
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn size(&self) -> Canvas {
        self.size
    }

    /// Most recently published surface, if any.
    pub fn latest(&self) -> Option<Arc<FrameRGBA>> {
        self.rx.borrow().clone()
    }

    /// Whether the producer side is still open.
    pub fn is_live(&self) -> bool {
        self.rx.has_changed().is_ok()
    }
}

/// Host facility able to record a [`CaptureStream`] in real time.
#[async_trait]
pub trait RecorderBackend: Send + Sync {
    fn name(&self) -> &str;

    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Start recording `stream`. `None` lets the backend pick its default format.
    async fn start(
        &self,
        stream: CaptureStream,
        mime_type: Option<&str>,
    ) -> ReelResult<Box<dyn RecordingSession>>;
}

/// A running recording.
#[async_trait]
pub trait RecordingSession: Send {
    /// MIME type of the produced bytes.
    fn mime_type(&self) -> &str;

    /// Stop recording, wait for the recorder to finalize, and return the recorded bytes.
    async fn stop(self: Box<Self>) -> ReelResult<Vec<u8>>;
}

/// First entry of `preferences` the backend supports.
pub fn pick_mime_type<'a>(
    backend: &dyn RecorderBackend,
    preferences: &'a [String],
) -> Option<&'a str> {
    preferences
        .iter()
        .map(String::as_str)
        .find(|m| backend.is_type_supported(m))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/recorder.rs"]
mod tests;
