use myteacher_cloud::StorageError;
use myteacher_core::error::CoreError;
use myteacher_core::types::TokenAmount;
use myteacher_openai::ChatError;
use myteacher_replicate::api::ReplicateApiError;

/// Failure of a collaborator call.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Image generation service error: {0}")]
    Replicate(#[from] ReplicateApiError),

    #[error("Chat service error: {0}")]
    Chat(#[from] ChatError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Rejected status change: {0}")]
    Transition(CoreError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    Unavailable(String),
}

/// Error that ends a run as `failed`.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Insufficient token balance: {required} required, {balance} available")]
    InsufficientBalance {
        required: TokenAmount,
        balance: TokenAmount,
    },

    #[error("Run panicked: {0}")]
    Panicked(String),
}
