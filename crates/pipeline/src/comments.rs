//! Per-event comment generation with a static fallback.

use std::sync::Arc;

use myteacher_core::comment::{self, EVENT_TYPES};
use myteacher_core::ledger::{CostLedger, UsageLineItem};
use myteacher_core::profile::CharacterProfile;
use myteacher_core::types::{DbId, TokenAmount};

use crate::accounting::CostAccountant;
use crate::error::PortError;
use crate::ports::{ChatCompleter, ChatReply, CommentRepository, UsageRecord};

/// Prompt sent for one event and the stored reply.
struct CommentExchange {
    prompt: String,
    reply: ChatReply,
}

/// Counts of one comment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommentSummary {
    pub generated: usize,
    pub defaulted: usize,
}

pub struct CommentPipeline {
    chat: Arc<dyn ChatCompleter>,
    comments: Arc<dyn CommentRepository>,
    accountant: Arc<CostAccountant>,
    pricing_model: String,
}

impl CommentPipeline {
    pub fn new(
        chat: Arc<dyn ChatCompleter>,
        comments: Arc<dyn CommentRepository>,
        accountant: Arc<CostAccountant>,
        pricing_model: String,
    ) -> Self {
        Self {
            chat,
            comments,
            accountant,
            pricing_model,
        }
    }

    /// Generate and store a comment for every catalog event type.
    ///
    /// Each billed comment appends one line item to `ledger`. A failed
    /// event stores its default comment at zero cost and never stops the
    /// remaining events.
    pub async fn run(
        &self,
        avatar_id: DbId,
        user_id: DbId,
        profile: &CharacterProfile,
        ledger: &mut CostLedger,
    ) -> CommentSummary {
        let mut summary = CommentSummary::default();

        for event_type in EVENT_TYPES {
            match self.generate_one(avatar_id, profile, event_type).await {
                Ok(exchange) => {
                    let reply = &exchange.reply;
                    let cost = self
                        .accountant
                        .chat_cost(
                            reply.usage.prompt_tokens,
                            reply.usage.completion_tokens,
                            &self.pricing_model,
                        )
                        .await;
                    ledger.append(UsageLineItem::comment(
                        comment::usage_label(event_type),
                        cost,
                        event_type,
                    ));
                    self.accountant
                        .log_usage(self.usage_record(
                            avatar_id, user_id, event_type, profile, &exchange, cost,
                        ))
                        .await;
                    summary.generated += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        avatar_id,
                        event_type = %event_type,
                        error = %e,
                        "Comment generation failed, storing default comment"
                    );
                    self.store_default(avatar_id, event_type).await;
                    summary.defaulted += 1;
                }
            }
        }

        tracing::info!(
            avatar_id,
            generated = summary.generated,
            defaulted = summary.defaulted,
            "Comment generation finished"
        );
        summary
    }

    /// Ask the LLM and store the trimmed reply.
    async fn generate_one(
        &self,
        avatar_id: DbId,
        profile: &CharacterProfile,
        event_type: &str,
    ) -> Result<CommentExchange, PortError> {
        let prompt = comment::build_comment_prompt(profile, event_type);
        let mut reply = self.chat.complete(&prompt).await?;

        let text = reply.text.trim();
        if text.is_empty() {
            return Err(PortError::Unavailable("empty comment".to_string()));
        }
        reply.text = text.to_string();

        self.comments.upsert(avatar_id, event_type, &reply.text).await?;
        tracing::debug!(avatar_id, event_type, comment = %reply.text, "Comment stored");
        Ok(CommentExchange { prompt, reply })
    }

    async fn store_default(&self, avatar_id: DbId, event_type: &str) {
        let text = comment::default_comment(event_type);
        if let Err(e) = self.comments.upsert(avatar_id, event_type, text).await {
            tracing::error!(avatar_id, event_type, error = %e, "Failed to store default comment");
        }
    }

    fn usage_record(
        &self,
        avatar_id: DbId,
        user_id: DbId,
        event_type: &str,
        profile: &CharacterProfile,
        exchange: &CommentExchange,
        token_cost: TokenAmount,
    ) -> UsageRecord {
        let reply = &exchange.reply;
        let total_tokens = reply.usage.prompt_tokens + reply.usage.completion_tokens;
        UsageRecord {
            user_id,
            avatar_id,
            model: self.pricing_model.clone(),
            detail: Some(event_type.to_string()),
            image_size: None,
            units: f64::from(total_tokens) / 1000.0,
            token_cost,
            request: serde_json::json!({
                "event_type": event_type,
                "theme": profile.theme.as_str(),
                "prompt": exchange.prompt,
            }),
            response: serde_json::json!({
                "content": reply.text,
                "input_tokens": reply.usage.prompt_tokens,
                "output_tokens": reply.usage.completion_tokens,
            }),
        }
    }
}
