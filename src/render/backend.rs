use crate::foundation::core::{Canvas, Progress};
use crate::foundation::error::{ReelError, ReelResult};

/// A rendered surface as RGBA8 pixels.
///
/// The `premultiplied` flag tells encoders whether colour channels are already scaled by alpha.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Opaque frame of `size` filled with one straight-alpha colour.
    pub fn solid(size: Canvas, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(size.rgba_len());
        for _ in 0..(size.width as usize * size.height as usize) {
            data.extend_from_slice(&rgba);
        }
        Self {
            width: size.width,
            height: size.height,
            data,
            premultiplied: false,
        }
    }

    pub fn size(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Check that `data` matches `width * height * 4`.
    pub fn validate(&self) -> ReelResult<()> {
        if self.data.len() != self.size().rgba_len() {
            return Err(ReelError::validation(format!(
                "frame data is {} bytes, expected {} for {}x{} rgba8",
                self.data.len(),
                self.size().rgba_len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}

/// Capabilities the export core needs from a scene renderer.
///
/// Every method is synchronous: when it returns, the renderer state reflects the call. Export
/// runs hold the renderer exclusively (`&mut`) for their whole duration.
pub trait ExportRenderer: Send {
    /// Switch the output surface to an explicit pixel size, independent of the display size.
    ///
    /// The first call after a restore snapshots the pre-export surface state.
    fn set_render_size(&mut self, width: u32, height: u32);

    /// Revert to the snapshotted surface state. A no-op when no snapshot is outstanding.
    fn restore_render_size(&mut self);

    /// Store `progress` and apply it to everything that depends on it.
    fn set_progress(&mut self, progress: Progress);

    /// Redraw immediately so the surface reflects the current progress.
    fn render_frame(&mut self);

    /// The most recently rendered surface.
    ///
    /// Fails with [`ReelError::RendererNotReady`] before the renderer is initialized.
    fn canvas(&self) -> ReelResult<&FrameRGBA>;
}
