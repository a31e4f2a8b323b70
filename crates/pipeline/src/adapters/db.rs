use async_trait::async_trait;
use myteacher_core::generation::AvatarGenerationStatus;
use myteacher_core::pricing::{
    self, CHAT_DETAIL_INPUT, CHAT_DETAIL_OUTPUT, DEFAULT_CHAT_INPUT_RATE, DEFAULT_CHAT_OUTPUT_RATE,
};
use myteacher_core::types::{DbId, TokenAmount};
use myteacher_db::models::ai_cost::{AiCostRate, CreateAiUsageLog};
use myteacher_db::models::token::{ConsumeOutcome, ConsumeTokens};
use myteacher_db::repositories::{
    AiCostRateRepo, AiUsageLogRepo, AvatarCommentRepo, AvatarImageRepo, AvatarRepo, TokenRepo,
};
use myteacher_db::DbPool;

use crate::error::PortError;
use crate::ports::{
    ArtifactRepository, AvatarStatusStore, ChargeOutcome, CommentRepository, Pricing,
    StoredArtifact, TokenCharge, TokenLedger, UsageAudit, UsageRecord,
};

/// `usable_type` of audit rows and `related_type` of token debits.
pub const USABLE_TYPE_TEACHER_AVATAR: &str = "teacher_avatar";

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Prices from `ai_cost_rates`, falling back to the fixed tables when no
/// rate is configured or the lookup fails.
pub struct DbPricing {
    pool: DbPool,
}

impl DbPricing {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn chat_rate(&self, model: &str, detail: &str, default: f64) -> f64 {
        match AiCostRateRepo::find_active(&self.pool, model, Some(detail)).await {
            Ok(Some(rate)) => rate.token_conversion_rate as f64,
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(model, detail, error = %e, "Chat rate lookup failed, using default");
                default
            }
        }
    }
}

#[async_trait]
impl Pricing for DbPricing {
    async fn image_cost(&self, model: &str, size: &str, count: u32) -> TokenAmount {
        let per_image = match AiCostRateRepo::find_active_for_image(&self.pool, model, size).await {
            Ok(Some(rate)) => rate.token_conversion_rate,
            Ok(None) => {
                tracing::debug!(model, size, "No active image rate, using fallback");
                pricing::fallback_image_cost(model, size)
            }
            Err(e) => {
                tracing::warn!(model, size, error = %e, "Image rate lookup failed, using fallback");
                pricing::fallback_image_cost(model, size)
            }
        };
        per_image * TokenAmount::from(count)
    }

    async fn chat_cost(&self, prompt_tokens: u32, completion_tokens: u32, model: &str) -> TokenAmount {
        let input_rate = self
            .chat_rate(model, CHAT_DETAIL_INPUT, DEFAULT_CHAT_INPUT_RATE)
            .await;
        let output_rate = self
            .chat_rate(model, CHAT_DETAIL_OUTPUT, DEFAULT_CHAT_OUTPUT_RATE)
            .await;
        pricing::chat_cost_from_rates(prompt_tokens, completion_tokens, input_rate, output_rate)
    }
}

// ---------------------------------------------------------------------------
// Usage audit
// ---------------------------------------------------------------------------

pub struct DbUsageAudit {
    pool: DbPool,
}

impl DbUsageAudit {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn matching_rate(&self, record: &UsageRecord) -> Result<Option<AiCostRate>, sqlx::Error> {
        match &record.image_size {
            Some(size) => AiCostRateRepo::find_active_for_image(&self.pool, &record.model, size).await,
            None => {
                AiCostRateRepo::find_active(&self.pool, &record.model, record.detail.as_deref())
                    .await
            }
        }
    }
}

#[async_trait]
impl UsageAudit for DbUsageAudit {
    async fn log_usage(&self, record: &UsageRecord) -> Result<(), PortError> {
        let rate = self.matching_rate(record).await?;
        let input = CreateAiUsageLog {
            user_id: record.user_id,
            usable_type: USABLE_TYPE_TEACHER_AVATAR.to_string(),
            usable_id: record.avatar_id,
            service_type: record.model.clone(),
            service_detail: record.detail.clone(),
            units_used: record.units,
            cost_usd: pricing::usd_cost(record.units, rate.as_ref().map(|r| r.unit_cost_usd)),
            token_cost: record.token_cost,
            cost_rate_id: rate.as_ref().map(|r| r.id),
            request_data: Some(record.request.clone()),
            response_data: Some(record.response.clone()),
        };
        AiUsageLogRepo::create(&self.pool, &input).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

pub struct DbArtifacts {
    pool: DbPool,
}

impl DbArtifacts {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtifactRepository for DbArtifacts {
    async fn find(
        &self,
        avatar_id: DbId,
        pose_type: &str,
        expression_type: &str,
    ) -> Result<Option<StoredArtifact>, PortError> {
        let image =
            AvatarImageRepo::find_for_cell(&self.pool, avatar_id, pose_type, expression_type).await?;
        Ok(image.map(|image| StoredArtifact {
            path: image.s3_path,
            url: image.s3_url,
        }))
    }

    async fn upsert(
        &self,
        avatar_id: DbId,
        pose_type: &str,
        expression_type: &str,
        artifact: &StoredArtifact,
    ) -> Result<(), PortError> {
        AvatarImageRepo::upsert(
            &self.pool,
            avatar_id,
            pose_type,
            expression_type,
            &artifact.path,
            &artifact.url,
        )
        .await?;
        Ok(())
    }
}

pub struct DbComments {
    pool: DbPool,
}

impl DbComments {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for DbComments {
    async fn upsert(&self, avatar_id: DbId, event_type: &str, text: &str) -> Result<(), PortError> {
        AvatarCommentRepo::upsert(&self.pool, avatar_id, event_type, text).await?;
        Ok(())
    }
}

pub struct DbAvatarStatus {
    pool: DbPool,
}

impl DbAvatarStatus {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvatarStatusStore for DbAvatarStatus {
    async fn set_status(
        &self,
        avatar_id: DbId,
        status: AvatarGenerationStatus,
    ) -> Result<(), PortError> {
        if !AvatarRepo::set_status(&self.pool, avatar_id, status).await? {
            let Some(avatar) = AvatarRepo::find_by_id(&self.pool, avatar_id).await? else {
                return Err(PortError::NotFound {
                    entity: "teacher_avatar",
                    id: avatar_id,
                });
            };
            let current = avatar.status();
            return Err(match current.validate_transition(status) {
                Err(e) => PortError::Transition(e),
                // Raced with another writer between the update and the read.
                Ok(()) => PortError::Unavailable(format!(
                    "status of avatar {avatar_id} changed concurrently to {current}"
                )),
            });
        }
        tracing::debug!(avatar_id, status = %status, "Generation status updated");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Token ledger
// ---------------------------------------------------------------------------

pub struct DbTokenLedger {
    pool: DbPool,
}

impl DbTokenLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenLedger for DbTokenLedger {
    async fn consume(&self, charge: &TokenCharge) -> Result<ChargeOutcome, PortError> {
        let usage_details = serde_json::to_value(&charge.usage)
            .map_err(|e| PortError::Unavailable(format!("usage serialization failed: {e}")))?;
        let input = ConsumeTokens {
            user_id: charge.user_id,
            amount: charge.amount,
            reason: charge.reason.clone(),
            related_type: Some(USABLE_TYPE_TEACHER_AVATAR.to_string()),
            related_id: Some(charge.avatar_id),
            usage_details: Some(usage_details),
            idempotency_key: charge.idempotency_key.clone(),
        };
        let outcome = match TokenRepo::consume(&self.pool, &input).await? {
            ConsumeOutcome::Consumed { balance_after } => ChargeOutcome::Consumed { balance_after },
            ConsumeOutcome::AlreadyApplied => ChargeOutcome::AlreadyApplied,
            ConsumeOutcome::InsufficientBalance { balance } => {
                ChargeOutcome::InsufficientBalance { balance }
            }
        };
        Ok(outcome)
    }
}
