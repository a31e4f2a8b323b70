//! Repository for the `ai_usage_logs` table.

use myteacher_core::types::DbId;
use sqlx::PgPool;

use crate::models::ai_cost::{AiUsageLog, CreateAiUsageLog};

const COLUMNS: &str = "id, user_id, usable_type, usable_id, service_type, service_detail, \
                       units_used, cost_usd, token_cost, cost_rate_id, request_data, \
                       response_data, created_at";

/// Append-only audit of AI operations.
pub struct AiUsageLogRepo;

impl AiUsageLogRepo {
    pub async fn create(pool: &PgPool, input: &CreateAiUsageLog) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO ai_usage_logs \
                 (user_id, usable_type, usable_id, service_type, service_detail, units_used, \
                  cost_usd, token_cost, cost_rate_id, request_data, response_data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING id",
        )
        .bind(input.user_id)
        .bind(&input.usable_type)
        .bind(input.usable_id)
        .bind(&input.service_type)
        .bind(input.service_detail.as_deref())
        .bind(input.units_used)
        .bind(input.cost_usd)
        .bind(input.token_cost)
        .bind(input.cost_rate_id)
        .bind(&input.request_data)
        .bind(&input.response_data)
        .fetch_one(pool)
        .await
    }

    /// Usage records for one subject, oldest first.
    pub async fn list_for_usable(
        pool: &PgPool,
        usable_type: &str,
        usable_id: DbId,
    ) -> Result<Vec<AiUsageLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ai_usage_logs \
             WHERE usable_type = $1 AND usable_id = $2 \
             ORDER BY id"
        );
        sqlx::query_as::<_, AiUsageLog>(&query)
            .bind(usable_type)
            .bind(usable_id)
            .fetch_all(pool)
            .await
    }

    /// Sum of `token_cost` over a subject's usage records.
    pub async fn total_token_cost(
        pool: &PgPool,
        usable_type: &str,
        usable_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(token_cost)::BIGINT FROM ai_usage_logs \
             WHERE usable_type = $1 AND usable_id = $2",
        )
        .bind(usable_type)
        .bind(usable_id)
        .fetch_one(pool)
        .await?;
        Ok(total.unwrap_or(0))
    }
}
