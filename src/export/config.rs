use crate::encode::recorder::DEFAULT_RECORDER_MIME_TYPES;
use crate::encode::session::{CodecChoice, VideoCodec};
use crate::export::Tier;
use crate::export::host::ExportHost;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};

/// Which tier failures are allowed to fall through to a weaker tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CascadePolicy {
    /// Retry as a still archive when the realtime recording fails.
    pub record_failure_falls_back: bool,
}

impl CascadePolicy {
    /// Tier to try after `failed` returned `err`, or `None` when `err` is fatal.
    pub fn next_tier(&self, failed: Tier, err: &ReelError, host: &ExportHost) -> Option<Tier> {
        match (failed, err) {
            (Tier::FrameExact, ReelError::NoSupportedCodec(_) | ReelError::EncodeFailed(_)) => {
                Some(host.first_tier_from(Tier::Realtime))
            }
            (Tier::Realtime, ReelError::RecordFailed(_)) if self.record_failure_falls_back => {
                Some(Tier::StillArchive)
            }
            _ => None,
        }
    }
}

/// Tunables of an export run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    pub fps: u32,
    /// Tier A forces a keyframe every this many frames.
    pub keyframe_interval: u32,
    /// Tier A waits for the encoder once more than this many frames are pending.
    pub backpressure_threshold: usize,
    /// Upper bound of a single backpressure wait.
    pub drain_wait_ms: u64,
    /// Upper bound of the final encoder flush.
    pub flush_timeout_ms: u64,
    /// Tier A yields to the runtime every this many frames.
    pub yield_every: u64,
    /// Tier C keeps every this-many-th frame, plus the last one.
    pub archive_stride: u64,
    /// Leading part of artifact file names.
    pub file_stem: String,
    /// Tier A codecs in order of preference.
    pub codecs: Vec<CodecChoice>,
    /// Tier B recording formats in order of preference.
    pub recorder_mime_types: Vec<String>,
    pub cascade: CascadePolicy,
    /// Skip tiers above this one. `None` starts at the best tier the host offers.
    pub start_tier: Option<Tier>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            width: 3840,
            height: 2160,
            fps: 30,
            keyframe_interval: 30,
            backpressure_threshold: 8,
            drain_wait_ms: 250,
            flush_timeout_ms: 20_000,
            yield_every: 5,
            archive_stride: 5,
            file_stem: "travel-route".to_string(),
            codecs: vec![
                CodecChoice {
                    codec: VideoCodec::Vp9,
                    bitrate_bps: 16_000_000,
                },
                CodecChoice {
                    codec: VideoCodec::H264,
                    bitrate_bps: 16_000_000,
                },
            ],
            recorder_mime_types: DEFAULT_RECORDER_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cascade: CascadePolicy::default(),
            start_tier: None,
        }
    }
}

impl ExportConfig {
    /// Load a JSON config; missing fields take their defaults.
    pub fn from_json(text: &str) -> ReelResult<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| ReelError::validation(format!("invalid export config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn canvas(&self) -> ReelResult<Canvas> {
        Canvas::new(self.width, self.height)
    }

    pub fn validate(&self) -> ReelResult<()> {
        let size = self.canvas()?;
        // yuv420p output needs even dimensions.
        if !size.width.is_multiple_of(2) || !size.height.is_multiple_of(2) {
            return Err(ReelError::validation(format!(
                "export size must be even, got {}x{}",
                size.width, size.height
            )));
        }
        if self.fps == 0 {
            return Err(ReelError::validation("fps must be non-zero"));
        }
        if self.keyframe_interval == 0 {
            return Err(ReelError::validation("keyframe_interval must be non-zero"));
        }
        if self.yield_every == 0 || self.archive_stride == 0 {
            return Err(ReelError::validation(
                "yield_every and archive_stride must be non-zero",
            ));
        }
        if self.flush_timeout_ms == 0 {
            return Err(ReelError::validation("flush_timeout_ms must be non-zero"));
        }
        if self.file_stem.is_empty()
            || self
                .file_stem
                .chars()
                .any(|c| matches!(c, '/' | '\\') || c.is_control())
        {
            return Err(ReelError::validation(format!(
                "file_stem '{}' is not a plain file name",
                self.file_stem
            )));
        }
        if self.codecs.iter().any(|c| c.bitrate_bps == 0) {
            return Err(ReelError::validation("codec bitrate must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/config.rs"]
mod tests;
