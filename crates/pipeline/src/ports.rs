//! Collaborator boundaries of the pipeline.
//!
//! Each trait is the narrowest contract the orchestrator needs from an
//! external system. Production implementations live in
//! [`crate::adapters`]; tests use in-memory fakes.

use async_trait::async_trait;
use myteacher_core::catalog::Expression;
use myteacher_core::generation::AvatarGenerationStatus;
use myteacher_core::ledger::UsageLineItem;
use myteacher_core::types::{DbId, TokenAmount};

use crate::error::PortError;

// ---------------------------------------------------------------------------
// Image generation
// ---------------------------------------------------------------------------

/// Per-request options for the image generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub model: String,
    pub expression: Expression,
}

/// A finished prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    pub url: String,
    pub prediction_id: String,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// `Ok(None)` means the service produced no image (content-policy
    /// rejection, failed or timed-out prediction).
    async fn generate(
        &self,
        prompt: &str,
        seed: i64,
        options: &GenerationOptions,
    ) -> Result<Option<GenerationOutput>, PortError>;
}

#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove_background(&self, image_url: &str)
        -> Result<Option<GenerationOutput>, PortError>;
}

// ---------------------------------------------------------------------------
// Pricing and accounting
// ---------------------------------------------------------------------------

/// Token prices. Lookups never fail; implementations fall back to fixed
/// tables.
#[async_trait]
pub trait Pricing: Send + Sync {
    async fn image_cost(&self, model: &str, size: &str, count: u32) -> TokenAmount;

    async fn chat_cost(&self, prompt_tokens: u32, completion_tokens: u32, model: &str)
        -> TokenAmount;
}

/// One audit row for a billable sub-operation.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub user_id: DbId,
    pub avatar_id: DbId,
    /// Model name; doubles as the pricing `service_type`.
    pub model: String,
    pub detail: Option<String>,
    /// Set for image operations, selecting the per-size rate.
    pub image_size: Option<String>,
    pub units: f64,
    pub token_cost: TokenAmount,
    pub request: serde_json::Value,
    pub response: serde_json::Value,
}

#[async_trait]
pub trait UsageAudit: Send + Sync {
    async fn log_usage(&self, record: &UsageRecord) -> Result<(), PortError>;
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    pub usage: ChatUsage,
}

#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<ChatReply, PortError>;
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `bytes` at `path` and return the stored path.
    async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<String, PortError>;

    fn public_url(&self, path: &str) -> String;
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PortError>;
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Stored location of one cell's image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub path: String,
    pub url: String,
}

/// Images keyed by `(avatar, pose, expression)`.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    async fn find(
        &self,
        avatar_id: DbId,
        pose_type: &str,
        expression_type: &str,
    ) -> Result<Option<StoredArtifact>, PortError>;

    /// Insert or replace the cell's artifact.
    async fn upsert(
        &self,
        avatar_id: DbId,
        pose_type: &str,
        expression_type: &str,
        artifact: &StoredArtifact,
    ) -> Result<(), PortError>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn upsert(&self, avatar_id: DbId, event_type: &str, text: &str) -> Result<(), PortError>;
}

#[async_trait]
pub trait AvatarStatusStore: Send + Sync {
    async fn set_status(
        &self,
        avatar_id: DbId,
        status: AvatarGenerationStatus,
    ) -> Result<(), PortError>;
}

// ---------------------------------------------------------------------------
// Tokens and notifications
// ---------------------------------------------------------------------------

/// Debit request for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenCharge {
    pub user_id: DbId,
    pub avatar_id: DbId,
    pub amount: TokenAmount,
    pub reason: String,
    /// Unique per run; a replay with the same key is a no-op.
    pub idempotency_key: String,
    pub usage: Vec<UsageLineItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeOutcome {
    Consumed { balance_after: TokenAmount },
    AlreadyApplied,
    InsufficientBalance { balance: TokenAmount },
}

#[async_trait]
pub trait TokenLedger: Send + Sync {
    async fn consume(&self, charge: &TokenCharge) -> Result<ChargeOutcome, PortError>;
}

/// End-of-run message for the avatar owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub user_id: DbId,
    pub avatar_id: DbId,
    pub succeeded: bool,
    pub title: String,
    pub body: String,
}

/// Fire-and-forget delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification);
}
