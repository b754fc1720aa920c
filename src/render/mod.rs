//! Renderer-facing side of the export pipeline.

/// Frame type and the renderer capability trait the export core drives.
pub mod backend;
/// Software globe renderer implementing [`backend::ExportRenderer`].
pub mod cpu;
