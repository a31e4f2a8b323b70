//! AI pricing rates and usage audit models.

use myteacher_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `ai_cost_rates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AiCostRate {
    pub id: DbId,
    pub service_type: String,
    pub service_detail: Option<String>,
    pub image_size: Option<String>,
    pub unit_cost_usd: f64,
    /// Tokens charged per unit (per image, or per 1000 chat tokens).
    pub token_conversion_rate: i64,
    pub is_active: bool,
    pub effective_from: Timestamp,
    pub note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `ai_usage_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AiUsageLog {
    pub id: DbId,
    pub user_id: DbId,
    pub usable_type: String,
    pub usable_id: DbId,
    pub service_type: String,
    pub service_detail: Option<String>,
    pub units_used: f64,
    pub cost_usd: f64,
    pub token_cost: i64,
    pub cost_rate_id: Option<DbId>,
    pub request_data: Option<serde_json::Value>,
    pub response_data: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

/// DTO for recording one billable AI operation.
#[derive(Debug, Clone)]
pub struct CreateAiUsageLog {
    pub user_id: DbId,
    pub usable_type: String,
    pub usable_id: DbId,
    pub service_type: String,
    pub service_detail: Option<String>,
    pub units_used: f64,
    pub cost_usd: f64,
    pub token_cost: i64,
    pub cost_rate_id: Option<DbId>,
    pub request_data: Option<serde_json::Value>,
    pub response_data: Option<serde_json::Value>,
}
