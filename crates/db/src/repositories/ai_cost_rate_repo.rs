//! Repository for the `ai_cost_rates` table.

use sqlx::PgPool;

use crate::models::ai_cost::AiCostRate;

/// Column list for `ai_cost_rates` queries.
const COLUMNS: &str = "id, service_type, service_detail, image_size, unit_cost_usd, \
                       token_conversion_rate, is_active, effective_from, note, created_at, updated_at";

/// Active pricing rate lookups.
pub struct AiCostRateRepo;

impl AiCostRateRepo {
    /// Most recent active rate for `service_type` and an optional detail.
    ///
    /// A `None` detail matches rows without a detail.
    pub async fn find_active(
        pool: &PgPool,
        service_type: &str,
        service_detail: Option<&str>,
    ) -> Result<Option<AiCostRate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ai_cost_rates \
             WHERE is_active AND effective_from <= NOW() \
               AND service_type = $1 \
               AND service_detail IS NOT DISTINCT FROM $2 \
             ORDER BY effective_from DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, AiCostRate>(&query)
            .bind(service_type)
            .bind(service_detail)
            .fetch_optional(pool)
            .await
    }

    /// Most recent active image rate for a model and size.
    ///
    /// Rows without an `image_size` apply to every size.
    pub async fn find_active_for_image(
        pool: &PgPool,
        service_type: &str,
        image_size: &str,
    ) -> Result<Option<AiCostRate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ai_cost_rates \
             WHERE is_active AND effective_from <= NOW() \
               AND service_type = $1 \
               AND (image_size = $2 OR image_size IS NULL) \
             ORDER BY image_size NULLS LAST, effective_from DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, AiCostRate>(&query)
            .bind(service_type)
            .bind(image_size)
            .fetch_optional(pool)
            .await
    }
}
