/// Convenience result type used across the crate.
pub type ReelResult<T> = Result<T, ReelError>;

/// Error taxonomy for renderer access, tier failures and configuration.
///
/// Which variants cascade to a lower export tier is decided by
/// [`CascadePolicy`](crate::CascadePolicy); everything else aborts the run.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// The renderer surface was read before the renderer finished initializing.
    #[error("renderer not ready: {0}")]
    RendererNotReady(String),

    /// No configured codec is supported by the host encoder.
    #[error("no supported codec: {0}")]
    NoSupportedCodec(String),

    /// The encoding session failed or did not flush in time.
    #[error("encode failed: {0}")]
    EncodeFailed(String),

    /// The realtime recording session failed.
    #[error("record failed: {0}")]
    RecordFailed(String),

    /// A still frame could not be converted or archived.
    #[error("archive failed: {0}")]
    ArchiveFailed(String),

    /// The caller cancelled the export between frames.
    #[error("export cancelled")]
    Cancelled,

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn renderer_not_ready(msg: impl Into<String>) -> Self {
        Self::RendererNotReady(msg.into())
    }

    pub fn no_supported_codec(msg: impl Into<String>) -> Self {
        Self::NoSupportedCodec(msg.into())
    }

    pub fn encode_failed(msg: impl Into<String>) -> Self {
        Self::EncodeFailed(msg.into())
    }

    pub fn record_failed(msg: impl Into<String>) -> Self {
        Self::RecordFailed(msg.into())
    }

    pub fn archive_failed(msg: impl Into<String>) -> Self {
        Self::ArchiveFailed(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
