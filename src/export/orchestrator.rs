use tokio_util::sync::CancellationToken;

use crate::export::config::ExportConfig;
use crate::export::host::ExportHost;
use crate::export::lease::SurfaceLease;
use crate::export::{
    ExportResult, ProgressSink, Tier, TierFailure, frame_exact, realtime, still_archive,
};
use crate::foundation::core::ExportProgress;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::ExportRenderer;

/// Where an export run currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportStage {
    Idle,
    SizingUp,
    TierAttempt(Tier),
    Finalizing,
}

/// Runs exports against one host with one configuration.
#[derive(Clone, Debug)]
pub struct Exporter {
    host: ExportHost,
    config: ExportConfig,
}

impl Exporter {
    /// Create an exporter; fails when `config` does not validate.
    pub fn new(host: ExportHost, config: ExportConfig) -> ReelResult<Self> {
        config.validate()?;
        Ok(Self { host, config })
    }

    pub fn host(&self) -> &ExportHost {
        &self.host
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// The tier a run starts with.
    pub fn first_tier(&self) -> Tier {
        self.host
            .first_tier_from(self.config.start_tier.unwrap_or(Tier::FrameExact))
    }

    /// Export `duration_secs` of animation, reporting every produced frame to `on_progress`.
    ///
    /// Reported frame numbers strictly increase across tier fallbacks. The renderer is resized
    /// for the run and restored before this returns, whatever the outcome.
    pub async fn export<F>(
        &self,
        renderer: &mut dyn ExportRenderer,
        duration_secs: f64,
        on_progress: F,
    ) -> ReelResult<ExportResult>
    where
        F: FnMut(ExportProgress) + Send,
    {
        self.export_with_cancel(
            renderer,
            duration_secs,
            on_progress,
            CancellationToken::new(),
        )
        .await
    }

    /// [`export`](Self::export) that stops with [`ReelError::Cancelled`] once `cancel` fires.
    #[tracing::instrument(
        name = "export",
        skip_all,
        fields(
            duration_secs = duration_secs,
            width = self.config.width,
            height = self.config.height
        )
    )]
    pub async fn export_with_cancel<F>(
        &self,
        renderer: &mut dyn ExportRenderer,
        duration_secs: f64,
        mut on_progress: F,
        cancel: CancellationToken,
    ) -> ReelResult<ExportResult>
    where
        F: FnMut(ExportProgress) + Send,
    {
        let size = self.config.canvas()?;
        let mut stage = ExportStage::Idle;
        advance(&mut stage, ExportStage::SizingUp);
        let mut lease = SurfaceLease::acquire(renderer, size);

        // A cascaded tier renders from frame 1 again; the caller only hears about new frames.
        let mut reported = 0u64;
        let mut forward = |p: ExportProgress| {
            if p.frame > reported {
                reported = p.frame;
                on_progress(p);
            }
        };

        let mut tier = self.first_tier();
        let mut failures: Vec<TierFailure> = Vec::new();
        let outcome = loop {
            advance(&mut stage, ExportStage::TierAttempt(tier));
            let attempt = self
                .run_tier(
                    tier,
                    lease.renderer(),
                    duration_secs,
                    &mut forward,
                    &cancel,
                    &failures,
                )
                .await;
            let err = match attempt {
                Ok(result) => break Ok(result),
                Err(err) => err,
            };
            match self.config.cascade.next_tier(tier, &err, &self.host) {
                Some(next) => {
                    tracing::warn!(
                        failed = %tier,
                        next = %next,
                        error = %err,
                        "export tier failed; cascading"
                    );
                    failures.push(TierFailure {
                        tier,
                        reason: err.to_string(),
                    });
                    tier = next;
                }
                None => {
                    tracing::error!(tier = %tier, error = %err, "export failed");
                    break Err(err);
                }
            }
        };

        advance(&mut stage, ExportStage::Finalizing);
        drop(lease);
        advance(&mut stage, ExportStage::Idle);

        if let Ok(result) = &outcome {
            tracing::info!(
                tier = %result.tier,
                file_name = %result.file_name,
                bytes = result.bytes.len(),
                degraded = result.warning.is_some(),
                "export finished"
            );
        }
        outcome
    }

    async fn run_tier(
        &self,
        tier: Tier,
        renderer: &mut dyn ExportRenderer,
        duration_secs: f64,
        on_progress: &mut ProgressSink<'_>,
        cancel: &CancellationToken,
        upstream: &[TierFailure],
    ) -> ReelResult<ExportResult> {
        let cfg = &self.config;
        match tier {
            Tier::FrameExact => {
                let encoder = self
                    .host
                    .encoder
                    .as_deref()
                    .ok_or_else(|| ReelError::no_supported_codec("host has no video encoder"))?;
                frame_exact::run(renderer, encoder, cfg, duration_secs, on_progress, cancel).await
            }
            Tier::Realtime => {
                let recorder = self
                    .host
                    .recorder
                    .as_deref()
                    .ok_or_else(|| ReelError::record_failed("host has no surface recorder"))?;
                realtime::run(
                    renderer,
                    recorder,
                    cfg,
                    duration_secs,
                    on_progress,
                    cancel,
                    upstream,
                )
                .await
            }
            Tier::StillArchive => {
                still_archive::run(renderer, cfg, duration_secs, on_progress, cancel, upstream)
                    .await
            }
        }
    }
}

fn advance(stage: &mut ExportStage, next: ExportStage) {
    tracing::debug!(from = ?*stage, to = ?next, "export stage");
    *stage = next;
}

#[cfg(test)]
#[path = "../../tests/unit/export/orchestrator.rs"]
mod tests;
