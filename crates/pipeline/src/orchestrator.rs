//! One avatar generation run.
//!
//! ```text
//! pending -> generating -> cells -> comments -> token debit -> completed
//!                 \___________ any escaped error or panic ___________-> failed
//! ```
//!
//! Cell-level problems (exhausted retries, failed background removal) are
//! logged and skipped. Anything that escapes a step ends the run as
//! `failed`. The terminal status is written once, after the run future
//! has finished or unwound, and the owner is always notified.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use myteacher_core::catalog::{Cell, Expression, GenerationCatalog};
use myteacher_core::generation::{
    notification_body, notification_title, AvatarGenerationStatus, TOKEN_CONSUME_REASON,
};
use myteacher_core::ledger::{
    cell_usage_detail, image_label, CostBreakdown, CostLedger, UsageLineItem,
};
use myteacher_core::mitigation::MitigationEngine;
use myteacher_core::pricing::MODEL_REMBG;
use myteacher_core::profile::CharacterProfile;
use myteacher_core::prompt;
use myteacher_core::storage;
use myteacher_core::types::{DbId, TokenAmount};
use uuid::Uuid;

use crate::accounting::CostAccountant;
use crate::comments::{CommentPipeline, CommentSummary};
use crate::config::PipelineConfig;
use crate::error::RunError;
use crate::ports::{
    ArtifactRepository, AvatarStatusStore, BackgroundRemover, ChargeOutcome, ChatCompleter,
    CommentRepository, ImageFetcher, ImageGenerator, ImageStore, Notification, Notifier, Pricing,
    StoredArtifact, TokenCharge, TokenLedger, UsageAudit, UsageRecord,
};
use crate::retry::{GenerationRetrier, GenerationSuccess};

/// Every external system a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn ImageGenerator>,
    pub background_remover: Arc<dyn BackgroundRemover>,
    pub pricing: Arc<dyn Pricing>,
    pub chat: Arc<dyn ChatCompleter>,
    pub store: Arc<dyn ImageStore>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub artifacts: Arc<dyn ArtifactRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub status: Arc<dyn AvatarStatusStore>,
    pub audit: Arc<dyn UsageAudit>,
    pub tokens: Arc<dyn TokenLedger>,
    pub notifier: Arc<dyn Notifier>,
}

/// Input of one run.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub avatar_id: DbId,
    pub user_id: DbId,
    pub profile: CharacterProfile,
}

/// How each cell of a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOutcome {
    Generated,
    /// Exhausted; the pose's `normal` image was copied in.
    Substituted,
    Skipped,
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: AvatarGenerationStatus,
    pub total_tokens: TokenAmount,
    pub usage: Vec<UsageLineItem>,
    pub cells: Vec<(String, Expression, CellOutcome)>,
    pub comments: CommentSummary,
    pub error: Option<String>,
}

impl RunReport {
    pub fn count(&self, outcome: CellOutcome) -> usize {
        self.cells.iter().filter(|(_, _, o)| *o == outcome).count()
    }
}

/// Mutable state confined to one run.
#[derive(Default)]
struct RunState {
    ledger: CostLedger,
    cells: Vec<(String, Expression, CellOutcome)>,
    comments: CommentSummary,
}

pub struct AvatarGenerationOrchestrator {
    collaborators: Collaborators,
    catalog: GenerationCatalog,
    config: PipelineConfig,
    retrier: GenerationRetrier,
    accountant: Arc<CostAccountant>,
    comment_pipeline: CommentPipeline,
}

impl AvatarGenerationOrchestrator {
    pub fn new(
        collaborators: Collaborators,
        catalog: GenerationCatalog,
        mitigation: MitigationEngine,
        config: PipelineConfig,
    ) -> Self {
        let retrier = GenerationRetrier::new(
            Arc::clone(&collaborators.generator),
            Arc::new(mitigation),
            config.max_retries,
            config.retry_delay,
        );
        let accountant = Arc::new(CostAccountant::new(
            Arc::clone(&collaborators.pricing),
            Arc::clone(&collaborators.audit),
        ));
        let comment_pipeline = CommentPipeline::new(
            Arc::clone(&collaborators.chat),
            Arc::clone(&collaborators.comments),
            Arc::clone(&accountant),
            config.chat_pricing_model.clone(),
        );
        Self {
            collaborators,
            catalog,
            config,
            retrier,
            accountant,
            comment_pipeline,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the job to a terminal status. Never returns an error: failures
    /// are reflected in the report's status.
    pub async fn run(&self, job: &GenerationJob) -> RunReport {
        let run_id = Uuid::new_v4();
        let mut state = RunState::default();
        tracing::info!(
            avatar_id = job.avatar_id,
            user_id = job.user_id,
            run_id = %run_id,
            is_chibi = job.profile.is_chibi,
            is_transparent = job.profile.is_transparent,
            "Avatar generation started"
        );

        let result = AssertUnwindSafe(self.execute(job, run_id, &mut state))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(RunError::Panicked(panic_message(panic.as_ref()))));

        let status = match &result {
            Ok(()) => AvatarGenerationStatus::Completed,
            Err(e) => {
                tracing::error!(
                    avatar_id = job.avatar_id,
                    run_id = %run_id,
                    error = %e,
                    "Avatar generation failed"
                );
                AvatarGenerationStatus::Failed
            }
        };

        if let Err(e) = self.collaborators.status.set_status(job.avatar_id, status).await {
            tracing::error!(avatar_id = job.avatar_id, status = %status, error = %e, "Failed to write final status");
        }

        let succeeded = result.is_ok();
        let total = state.ledger.total();
        self.collaborators
            .notifier
            .send(Notification {
                user_id: job.user_id,
                avatar_id: job.avatar_id,
                succeeded,
                title: notification_title(succeeded).to_string(),
                body: notification_body(succeeded, job.profile.draw_model_version.as_deref(), total),
            })
            .await;

        tracing::info!(
            avatar_id = job.avatar_id,
            run_id = %run_id,
            status = %status,
            total_tokens = total,
            "Avatar generation finished"
        );

        RunReport {
            run_id,
            status,
            total_tokens: total,
            usage: state.ledger.into_items(),
            cells: state.cells,
            comments: state.comments,
            error: result.err().map(|e| e.to_string()),
        }
    }

    async fn execute(
        &self,
        job: &GenerationJob,
        run_id: Uuid,
        state: &mut RunState,
    ) -> Result<(), RunError> {
        self.collaborators
            .status
            .set_status(job.avatar_id, AvatarGenerationStatus::Generating)
            .await?;

        let model = job.profile.model_name(&self.config.default_model).to_string();
        let size = self.config.image_size();
        let base_prompt = prompt::build_base_prompt(&job.profile);

        for cell in self.catalog.cells(job.profile.is_chibi) {
            let outcome = self
                .process_cell(job, &cell, &base_prompt, &model, &size, &mut state.ledger)
                .await?;
            state
                .cells
                .push((cell.pose_key.clone(), cell.expression, outcome));
        }

        state.comments = self
            .comment_pipeline
            .run(job.avatar_id, job.user_id, &job.profile, &mut state.ledger)
            .await;

        self.settle(job, run_id, &state.ledger).await
    }

    /// Generate, post-process, store and bill one cell.
    async fn process_cell(
        &self,
        job: &GenerationJob,
        cell: &Cell,
        base_prompt: &str,
        model: &str,
        size: &str,
        ledger: &mut CostLedger,
    ) -> Result<CellOutcome, RunError> {
        let pose = cell.pose_key.as_str();
        let expression = cell.expression;
        let full_prompt = prompt::build_full_prompt(
            base_prompt,
            &cell.pose_description,
            self.catalog.expression_prompt(expression),
        );

        let Some(generated) = self
            .retrier
            .generate_with_retry(&full_prompt, job.profile.seed, expression, pose, model)
            .await
        else {
            return self.substitute_normal(job.avatar_id, pose, expression).await;
        };

        let mut breakdown = CostBreakdown {
            generation: self.accountant.generation_cost(model, size).await,
            background_removal: 0,
        };

        let mut final_url = generated.url.clone();
        let mut removal = None;
        if job.profile.is_transparent {
            match self
                .collaborators
                .background_remover
                .remove_background(&generated.url)
                .await
            {
                Ok(Some(output)) => {
                    breakdown.background_removal =
                        self.accountant.background_removal_cost(size).await;
                    final_url = output.url.clone();
                    removal = Some(output);
                }
                Ok(None) => {
                    tracing::error!(avatar_id = job.avatar_id, pose_type = pose, expression_type = %expression, "Background removal produced no image, discarding cell");
                    return Ok(CellOutcome::Skipped);
                }
                Err(e) => {
                    tracing::error!(avatar_id = job.avatar_id, pose_type = pose, expression_type = %expression, error = %e, "Background removal failed, discarding cell");
                    return Ok(CellOutcome::Skipped);
                }
            }
        }

        let bytes = self.collaborators.fetcher.fetch(&final_url).await?;
        let path = storage::upload_path(
            job.user_id,
            pose,
            expression.as_str(),
            chrono::Utc::now().timestamp(),
        );
        let stored_path = self.collaborators.store.upload(bytes, &path).await?;
        let artifact = StoredArtifact {
            url: self.collaborators.store.public_url(&stored_path),
            path: stored_path,
        };
        self.collaborators
            .artifacts
            .upsert(job.avatar_id, pose, expression.as_str(), &artifact)
            .await?;

        ledger.append(UsageLineItem::image(
            image_label(
                &cell.pose_label,
                expression.as_str(),
                model,
                job.profile.is_transparent,
            ),
            breakdown,
            job.profile.seed,
            pose,
            expression.as_str(),
        ));

        self.accountant
            .log_usage(generation_record(
                job,
                pose,
                expression,
                model,
                size,
                &generated,
                breakdown.generation,
            ))
            .await;
        if let Some(output) = removal {
            self.accountant
                .log_usage(UsageRecord {
                    user_id: job.user_id,
                    avatar_id: job.avatar_id,
                    model: MODEL_REMBG.to_string(),
                    detail: Some(cell_usage_detail(pose, expression.as_str(), true)),
                    image_size: Some(size.to_string()),
                    units: 1.0,
                    token_cost: breakdown.background_removal,
                    request: serde_json::json!({ "image": generated.url }),
                    response: serde_json::json!({
                        "url": output.url,
                        "prediction_id": output.prediction_id,
                    }),
                })
                .await;
        }

        tracing::info!(
            avatar_id = job.avatar_id,
            pose_type = pose,
            expression_type = %expression,
            attempt = generated.attempt,
            mitigated = generated.mitigated,
            token_cost = breakdown.total(),
            path = %artifact.path,
            "Cell generated"
        );
        Ok(CellOutcome::Generated)
    }

    /// Copy the pose's stored `normal` image into an exhausted cell.
    async fn substitute_normal(
        &self,
        avatar_id: DbId,
        pose: &str,
        expression: Expression,
    ) -> Result<CellOutcome, RunError> {
        let normal = self
            .collaborators
            .artifacts
            .find(avatar_id, pose, Expression::Normal.as_str())
            .await?;

        let Some(normal) = normal else {
            tracing::error!(avatar_id, pose_type = pose, expression_type = %expression, "Generation exhausted and no normal image to reuse, skipping cell");
            return Ok(CellOutcome::Skipped);
        };

        self.collaborators
            .artifacts
            .upsert(avatar_id, pose, expression.as_str(), &normal)
            .await?;
        tracing::warn!(avatar_id, pose_type = pose, expression_type = %expression, "Generation exhausted, reused normal image");
        Ok(CellOutcome::Substituted)
    }

    /// Debit the run total from the owner's balance.
    async fn settle(&self, job: &GenerationJob, run_id: Uuid, ledger: &CostLedger) -> Result<(), RunError> {
        let amount = ledger.total();
        if amount == 0 {
            tracing::info!(avatar_id = job.avatar_id, "Nothing billable, skipping token debit");
            return Ok(());
        }

        let charge = TokenCharge {
            user_id: job.user_id,
            avatar_id: job.avatar_id,
            amount,
            reason: TOKEN_CONSUME_REASON.to_string(),
            idempotency_key: format!("avatar-generation:{}:{run_id}", job.avatar_id),
            usage: ledger.items().to_vec(),
        };

        match self.collaborators.tokens.consume(&charge).await? {
            ChargeOutcome::Consumed { balance_after } => {
                tracing::info!(avatar_id = job.avatar_id, user_id = job.user_id, amount, balance_after, "Tokens consumed");
                Ok(())
            }
            ChargeOutcome::AlreadyApplied => {
                tracing::warn!(avatar_id = job.avatar_id, key = %charge.idempotency_key, "Token debit already applied");
                Ok(())
            }
            ChargeOutcome::InsufficientBalance { balance } => Err(RunError::InsufficientBalance {
                required: amount,
                balance,
            }),
        }
    }
}

fn generation_record(
    job: &GenerationJob,
    pose: &str,
    expression: Expression,
    model: &str,
    size: &str,
    generated: &GenerationSuccess,
    token_cost: TokenAmount,
) -> UsageRecord {
    UsageRecord {
        user_id: job.user_id,
        avatar_id: job.avatar_id,
        model: model.to_string(),
        detail: Some(cell_usage_detail(pose, expression.as_str(), false)),
        image_size: Some(size.to_string()),
        units: 1.0,
        token_cost,
        request: serde_json::json!({
            "prompt": generated.prompt,
            "seed": job.profile.seed,
            "size": size,
            "attempt": generated.attempt,
            "mitigated": generated.mitigated,
        }),
        response: serde_json::json!({
            "url": generated.url,
            "prediction_id": generated.prediction_id,
        }),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
