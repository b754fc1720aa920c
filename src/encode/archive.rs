use std::io::{Cursor, Write as _};

use image::{ExtendedColorType, ImageEncoder as _, codecs::png::PngEncoder};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::FrameRGBA;

/// Archive entry name of the `index`-th captured still: `frame-00000.png`, ...
pub fn frame_entry_name(index: usize) -> String {
    format!("frame-{index:05}.png")
}

/// Encode `frame` as a standalone PNG with straight alpha.
pub fn encode_png(frame: &FrameRGBA) -> ReelResult<Vec<u8>> {
    frame
        .validate()
        .map_err(|e| ReelError::archive_failed(format!("PNG conversion failed: {e}")))?;

    let straight;
    let pixels = if frame.premultiplied {
        straight = unpremultiply(&frame.data);
        &straight
    } else {
        &frame.data
    };

    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(pixels, frame.width, frame.height, ExtendedColorType::Rgba8)
        .map_err(|e| ReelError::archive_failed(format!("PNG conversion failed: {e}")))?;
    Ok(out)
}

fn unpremultiply(src: &[u8]) -> Vec<u8> {
    let mut out = src.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}

/// In-memory ZIP of sequentially numbered PNG stills.
pub struct FrameArchive {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    count: usize,
}

impl FrameArchive {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            count: 0,
        }
    }

    /// Number of stills added so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// PNG-encode `frame` and store it under the next sequential name, which is returned.
    pub fn push_frame(&mut self, frame: &FrameRGBA) -> ReelResult<String> {
        let png = encode_png(frame)?;
        let name = frame_entry_name(self.count);
        // PNG data is already deflated.
        let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        self.zip
            .start_file(name.as_str(), opts)
            .map_err(|e| ReelError::archive_failed(format!("zip entry '{name}': {e}")))?;
        self.zip
            .write_all(&png)
            .map_err(|e| ReelError::archive_failed(format!("zip write '{name}': {e}")))?;
        self.count += 1;
        Ok(name)
    }

    /// Write the central directory and return the archive bytes.
    pub fn finish(self) -> ReelResult<Vec<u8>> {
        let cursor = self
            .zip
            .finish()
            .map_err(|e| ReelError::archive_failed(format!("zip finalize: {e}")))?;
        Ok(cursor.into_inner())
    }
}

impl Default for FrameArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/archive.rs"]
mod tests;
