//! Host media primitives used by the export tiers.
//!
//! Each tier talks to a trait here; the `ffmpeg` modules provide the production implementations.

/// PNG frame encoding and the ZIP frame archive.
pub mod archive;
/// `ffmpeg`-backed encoder sessions and host capability probing.
pub mod ffmpeg;
/// `ffmpeg`-backed realtime surface recorder.
pub mod ffmpeg_record;
/// Realtime capture stream and recorder contracts.
pub mod recorder;
/// Frame-exact encoder contracts, codecs and frame units.
pub mod session;
