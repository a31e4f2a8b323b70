//! Repository for `token_balances` and `token_transactions`.

use myteacher_core::types::{DbId, TokenAmount};
use sqlx::PgPool;

use crate::models::token::{ConsumeOutcome, ConsumeTokens, TokenTransaction, TRANSACTION_CONSUME};

const TRANSACTION_COLUMNS: &str = "id, user_id, type, amount, balance_after, reason, related_type, \
                                   related_id, usage_details, idempotency_key, created_at";

/// Prepaid token ledger.
pub struct TokenRepo;

impl TokenRepo {
    /// Current balance, or 0 when the user has no balance row.
    pub async fn balance(pool: &PgPool, user_id: DbId) -> Result<TokenAmount, sqlx::Error> {
        let balance: Option<TokenAmount> =
            sqlx::query_scalar("SELECT balance FROM token_balances WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        Ok(balance.unwrap_or(0))
    }

    /// Add `amount` to a user's balance, creating the row if needed.
    pub async fn credit(
        pool: &PgPool,
        user_id: DbId,
        amount: TokenAmount,
    ) -> Result<TokenAmount, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO token_balances (user_id, balance) VALUES ($1, $2) \
             ON CONFLICT (user_id) \
             DO UPDATE SET balance = token_balances.balance + EXCLUDED.balance, updated_at = NOW() \
             RETURNING balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(pool)
        .await
    }

    /// Debit tokens in a single transaction.
    ///
    /// Locks the balance row, skips keys already journaled, rejects debits
    /// larger than the balance, then records the transaction and lowers
    /// the balance.
    pub async fn consume(pool: &PgPool, input: &ConsumeTokens) -> Result<ConsumeOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let balance: Option<TokenAmount> = sqlx::query_scalar(
            "SELECT balance FROM token_balances WHERE user_id = $1 FOR UPDATE",
        )
        .bind(input.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let replayed: Option<DbId> =
            sqlx::query_scalar("SELECT id FROM token_transactions WHERE idempotency_key = $1")
                .bind(&input.idempotency_key)
                .fetch_optional(&mut *tx)
                .await?;
        if replayed.is_some() {
            tx.rollback().await?;
            return Ok(ConsumeOutcome::AlreadyApplied);
        }

        let balance = balance.unwrap_or(0);
        if balance < input.amount {
            tx.rollback().await?;
            return Ok(ConsumeOutcome::InsufficientBalance { balance });
        }
        let balance_after = balance - input.amount;

        sqlx::query(
            "INSERT INTO token_transactions \
                 (user_id, type, amount, balance_after, reason, related_type, related_id, \
                  usage_details, idempotency_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(input.user_id)
        .bind(TRANSACTION_CONSUME)
        .bind(-input.amount)
        .bind(balance_after)
        .bind(&input.reason)
        .bind(input.related_type.as_deref())
        .bind(input.related_id)
        .bind(&input.usage_details)
        .bind(&input.idempotency_key)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO token_balances (user_id, balance) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET balance = EXCLUDED.balance, updated_at = NOW()",
        )
        .bind(input.user_id)
        .bind(balance_after)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ConsumeOutcome::Consumed { balance_after })
    }

    /// Journal entries for a user, newest first.
    pub async fn list_transactions(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<TokenTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM token_transactions \
             WHERE user_id = $1 \
             ORDER BY id DESC"
        );
        sqlx::query_as::<_, TokenTransaction>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
