//! Route geometry and the progress sampler shared by playback and export.

/// Geographic points, great-circle arcs and the Earth-centred projection.
pub mod geo;
/// Progress-to-frame sampling over an ordered point sequence.
pub mod sampler;
