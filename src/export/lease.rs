use crate::foundation::core::{Canvas, Progress};
use crate::render::backend::ExportRenderer;

/// Exclusive hold on a renderer resized for export.
///
/// Dropping the lease restores the pre-export surface, rewinds progress to the start and renders
/// once, so the display is back in its resting state however the export ended.
pub struct SurfaceLease<'r> {
    renderer: &'r mut dyn ExportRenderer,
}

impl<'r> SurfaceLease<'r> {
    pub fn acquire(renderer: &'r mut dyn ExportRenderer, size: Canvas) -> Self {
        renderer.set_render_size(size.width, size.height);
        tracing::debug!(
            width = size.width,
            height = size.height,
            "render surface leased"
        );
        Self { renderer }
    }

    pub fn renderer(&mut self) -> &mut dyn ExportRenderer {
        &mut *self.renderer
    }
}

impl Drop for SurfaceLease<'_> {
    fn drop(&mut self) {
        self.renderer.restore_render_size();
        self.renderer.set_progress(Progress::START);
        self.renderer.render_frame();
        tracing::debug!("render surface restored");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/lease.rs"]
mod tests;
