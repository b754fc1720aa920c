use std::sync::Arc;

use crate::encode::ffmpeg::FfmpegHost;
use crate::encode::recorder::RecorderBackend;
use crate::encode::session::EncoderBackend;
use crate::export::Tier;

/// Host facilities the export can use. Tier C needs nothing and is always available.
#[derive(Clone, Default)]
pub struct ExportHost {
    /// Frame-exact encoder (Tier A).
    pub encoder: Option<Arc<dyn EncoderBackend>>,
    /// Realtime surface recorder (Tier B).
    pub recorder: Option<Arc<dyn RecorderBackend>>,
}

impl ExportHost {
    /// A host with neither encoder nor recorder.
    pub fn archive_only() -> Self {
        Self::default()
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn EncoderBackend>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn RecorderBackend>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Probe the system `ffmpeg` and expose whatever it can do.
    pub async fn detect() -> Self {
        let Some(ffmpeg) = FfmpegHost::probe().await else {
            tracing::info!("ffmpeg not found; only the still archive is available");
            return Self::default();
        };
        let ffmpeg = Arc::new(ffmpeg);
        let mut host = Self::default();
        if ffmpeg.has_encoder("libvpx-vp9") || ffmpeg.has_encoder("libx264") {
            host.encoder = Some(ffmpeg.clone() as Arc<dyn EncoderBackend>);
        }
        if ["video/webm", "video/mp4"]
            .into_iter()
            .any(|m| RecorderBackend::is_type_supported(ffmpeg.as_ref(), m))
        {
            host.recorder = Some(ffmpeg as Arc<dyn RecorderBackend>);
        }
        tracing::info!(
            encoder = host.encoder.is_some(),
            recorder = host.recorder.is_some(),
            "export host detected"
        );
        host
    }

    pub fn has_tier(&self, tier: Tier) -> bool {
        match tier {
            Tier::FrameExact => self.encoder.is_some(),
            Tier::Realtime => self.recorder.is_some(),
            Tier::StillArchive => true,
        }
    }

    /// The most faithful available tier that is not above `floor`.
    pub fn first_tier_from(&self, floor: Tier) -> Tier {
        [Tier::FrameExact, Tier::Realtime, Tier::StillArchive]
            .into_iter()
            .find(|t| *t >= floor && self.has_tier(*t))
            .unwrap_or(Tier::StillArchive)
    }
}

impl std::fmt::Debug for ExportHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportHost")
            .field(
                "encoder",
                &self.encoder.as_ref().map(|e| e.name().to_string()),
            )
            .field(
                "recorder",
                &self.recorder.as_ref().map(|r| r.name().to_string()),
            )
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/host.rs"]
mod tests;
