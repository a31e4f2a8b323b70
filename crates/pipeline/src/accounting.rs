//! Pricing lookups and usage audit for one run.

use std::sync::Arc;

use myteacher_core::pricing::MODEL_REMBG;
use myteacher_core::types::TokenAmount;

use crate::ports::{Pricing, UsageAudit, UsageRecord};

pub struct CostAccountant {
    pricing: Arc<dyn Pricing>,
    audit: Arc<dyn UsageAudit>,
}

impl CostAccountant {
    pub fn new(pricing: Arc<dyn Pricing>, audit: Arc<dyn UsageAudit>) -> Self {
        Self { pricing, audit }
    }

    /// Cost of one generated image of `size` with `model`.
    pub async fn generation_cost(&self, model: &str, size: &str) -> TokenAmount {
        self.pricing.image_cost(model, size, 1).await
    }

    /// Cost of one background removal.
    pub async fn background_removal_cost(&self, size: &str) -> TokenAmount {
        self.pricing.image_cost(MODEL_REMBG, size, 1).await
    }

    pub async fn chat_cost(&self, prompt_tokens: u32, completion_tokens: u32, model: &str) -> TokenAmount {
        self.pricing
            .chat_cost(prompt_tokens, completion_tokens, model)
            .await
    }

    /// Write an audit row. Failures are logged and swallowed.
    pub async fn log_usage(&self, record: UsageRecord) {
        if let Err(e) = self.audit.log_usage(&record).await {
            tracing::error!(
                avatar_id = record.avatar_id,
                model = %record.model,
                detail = ?record.detail,
                token_cost = record.token_cost,
                error = %e,
                "Failed to record AI usage"
            );
        }
    }
}
