//! Token balance and transaction journal models.

use myteacher_core::types::{DbId, Timestamp, TokenAmount};
use serde::Serialize;
use sqlx::FromRow;

/// Transaction type recorded when tokens are spent.
pub const TRANSACTION_CONSUME: &str = "consume";

/// A row from the `token_balances` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TokenBalance {
    pub id: DbId,
    pub user_id: DbId,
    pub balance: TokenAmount,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `token_transactions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TokenTransaction {
    pub id: DbId,
    pub user_id: DbId,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub amount: TokenAmount,
    pub balance_after: TokenAmount,
    pub reason: String,
    pub related_type: Option<String>,
    pub related_id: Option<DbId>,
    pub usage_details: Option<serde_json::Value>,
    pub idempotency_key: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for a token debit.
#[derive(Debug, Clone)]
pub struct ConsumeTokens {
    pub user_id: DbId,
    pub amount: TokenAmount,
    pub reason: String,
    pub related_type: Option<String>,
    pub related_id: Option<DbId>,
    pub usage_details: Option<serde_json::Value>,
    /// Replaying a key already in the journal is a no-op.
    pub idempotency_key: String,
}

/// Result of [`crate::repositories::TokenRepo::consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed { balance_after: TokenAmount },
    AlreadyApplied,
    InsufficientBalance { balance: TokenAmount },
}
