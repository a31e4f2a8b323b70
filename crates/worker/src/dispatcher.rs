//! Background generation dispatcher.
//!
//! Polls for pending avatars every `poll_interval` and runs them through
//! the [`AvatarGenerationOrchestrator`]. Claims use
//! [`AvatarRepo::claim_next_pending`] so several workers can share one
//! database without running the same avatar twice.
//!
//! A claim is a lease: the running worker renews it, and an avatar whose
//! claim outlived the lease is either claimed again (run never started)
//! or marked `failed` (run started, worker gone).

use std::sync::Arc;
use std::time::Duration;

use myteacher_core::generation::{AvatarGenerationStatus, DEFAULT_CLAIM_LEASE_SECS};
use myteacher_db::repositories::AvatarRepo;
use myteacher_db::DbPool;
use myteacher_pipeline::{AvatarGenerationOrchestrator, GenerationJob, RunReport};
use tokio_util::sync::CancellationToken;

/// Default polling interval for the dispatcher loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default claim lease.
pub const DEFAULT_CLAIM_LEASE: Duration = Duration::from_secs(DEFAULT_CLAIM_LEASE_SECS);

pub struct GenerationDispatcher {
    pool: DbPool,
    orchestrator: Arc<AvatarGenerationOrchestrator>,
    poll_interval: Duration,
    claim_lease: Duration,
}

impl GenerationDispatcher {
    pub fn new(pool: DbPool, orchestrator: Arc<AvatarGenerationOrchestrator>) -> Self {
        Self {
            pool,
            orchestrator,
            poll_interval: DEFAULT_POLL_INTERVAL,
            claim_lease: DEFAULT_CLAIM_LEASE,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Claims older than `claim_lease` are considered abandoned. A running
    /// job renews its claim three times per lease.
    pub fn with_claim_lease(mut self, claim_lease: Duration) -> Self {
        self.claim_lease = claim_lease;
        self
    }

    /// Run the dispatcher loop until the cancellation token is triggered.
    ///
    /// A run in progress is finished before the loop observes cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            claim_lease_secs = self.claim_lease.as_secs(),
            "Generation dispatcher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Generation dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.recover_stale_runs().await {
                        tracing::error!(error = %e, "Stale run recovery failed");
                    }
                    if let Err(e) = self.drain(&cancel).await {
                        tracing::error!(error = %e, "Dispatch cycle failed");
                    }
                }
            }
        }
    }

    /// Fail `generating` avatars whose worker stopped renewing its claim.
    pub async fn recover_stale_runs(&self) -> Result<Vec<i64>, sqlx::Error> {
        let failed = AvatarRepo::fail_stale_runs(&self.pool, self.claim_lease).await?;
        for avatar_id in &failed {
            tracing::warn!(avatar_id, "Abandoned generation run marked failed");
        }
        Ok(failed)
    }

    /// Run pending avatars until none are left or shutdown is requested.
    async fn drain(&self, cancel: &CancellationToken) -> Result<(), sqlx::Error> {
        while !cancel.is_cancelled() {
            if self.dispatch_next().await?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Claim and run the next pending avatar.
    ///
    /// Returns `None` when nothing was claimed. The claim is released on
    /// every path that leaves the avatar `pending`.
    pub async fn dispatch_next(&self) -> Result<Option<RunReport>, sqlx::Error> {
        let Some(claimed) = AvatarRepo::claim_next_pending(&self.pool, self.claim_lease).await?
        else {
            return Ok(None);
        };
        tracing::info!(
            avatar_id = claimed.id,
            user_id = claimed.user_id,
            "Avatar claimed for generation",
        );

        let loaded = match AvatarRepo::load_profile(&self.pool, claimed.id).await {
            Ok(loaded) => loaded,
            Err(e) => {
                self.release(claimed.id).await;
                return Err(e);
            }
        };
        let Some((avatar, profile)) = loaded else {
            tracing::warn!(avatar_id = claimed.id, "Claimed avatar disappeared");
            return Ok(None);
        };

        let job = GenerationJob {
            avatar_id: avatar.id,
            user_id: avatar.user_id,
            profile,
        };
        let report = self.run_with_renewal(&job).await;
        // Both status writes failed: the avatar is still pending.
        self.release(job.avatar_id).await;

        match report.status {
            AvatarGenerationStatus::Completed => tracing::info!(
                avatar_id = job.avatar_id,
                run_id = %report.run_id,
                total_tokens = report.total_tokens,
                "Avatar generation completed",
            ),
            _ => tracing::warn!(
                avatar_id = job.avatar_id,
                run_id = %report.run_id,
                error = report.error.as_deref().unwrap_or("unknown"),
                "Avatar generation failed",
            ),
        }
        Ok(Some(report))
    }

    /// Run the job while keeping its claim fresh.
    async fn run_with_renewal(&self, job: &GenerationJob) -> RunReport {
        let run = self.orchestrator.run(job);
        tokio::pin!(run);

        let period = (self.claim_lease / 3).max(Duration::from_secs(1));
        let mut renewal = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            tokio::select! {
                report = &mut run => return report,
                _ = renewal.tick() => {
                    if let Err(e) = AvatarRepo::renew_claim(&self.pool, job.avatar_id).await {
                        tracing::warn!(avatar_id = job.avatar_id, error = %e, "Failed to renew claim");
                    }
                }
            }
        }
    }

    async fn release(&self, avatar_id: i64) {
        match AvatarRepo::release_claim(&self.pool, avatar_id).await {
            Ok(true) => tracing::warn!(avatar_id, "Released claim of unstarted run"),
            Ok(false) => {}
            Err(e) => tracing::error!(
                avatar_id,
                error = %e,
                "Failed to release claim, it expires with the lease"
            ),
        }
    }
}
