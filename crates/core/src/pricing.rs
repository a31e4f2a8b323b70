//! Token pricing rules shared by the database-backed pricing service.
//!
//! Rates normally come from the `ai_cost_rates` table. When a rate is
//! missing the fallback table below applies so a run can still be billed.

use crate::types::TokenAmount;

// ---------------------------------------------------------------------------
// Service and model names
// ---------------------------------------------------------------------------

// Rates are keyed by `service_type` = model name. Image rates are further
// selected by `image_size`, chat rates by `service_detail`.

/// `service_detail` of a chat model's input-token rate.
pub const CHAT_DETAIL_INPUT: &str = "input";
/// `service_detail` of a chat model's output-token rate.
pub const CHAT_DETAIL_OUTPUT: &str = "output";

pub const MODEL_ANYTHING_V4: &str = "anything-v4.0";
pub const MODEL_ANIMAGINE_XL: &str = "animagine-xl-3.1";
pub const MODEL_SD_35_MEDIUM: &str = "stable-diffusion-3.5-medium";
/// Background removal model.
pub const MODEL_REMBG: &str = "rembg";

/// Chat input rate per 1000 tokens when none is configured.
pub const DEFAULT_CHAT_INPUT_RATE: f64 = 30.0;
/// Chat output rate per 1000 tokens when none is configured.
pub const DEFAULT_CHAT_OUTPUT_RATE: f64 = 60.0;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `"{width}x{height}"` size string used for image pricing.
pub fn image_size_string(width: u32, height: u32) -> String {
    format!("{width}x{height}")
}

/// Per-image token cost when no active rate exists for `model`.
pub fn fallback_image_cost(model: &str, size: &str) -> TokenAmount {
    match model {
        MODEL_ANYTHING_V4 => match size {
            "512x512" => 5000,
            "768x768" => 7500,
            "1024x1024" => 10000,
            _ => 5000,
        },
        MODEL_ANIMAGINE_XL => 2000,
        MODEL_SD_35_MEDIUM => 23000,
        MODEL_REMBG => 50,
        _ => 0,
    }
}

/// Chat token cost, rounding each direction up independently.
pub fn chat_cost_from_rates(
    prompt_tokens: u32,
    completion_tokens: u32,
    input_rate: f64,
    output_rate: f64,
) -> TokenAmount {
    let input = (f64::from(prompt_tokens) / 1000.0 * input_rate).ceil();
    let output = (f64::from(completion_tokens) / 1000.0 * output_rate).ceil();
    input as TokenAmount + output as TokenAmount
}

/// Audit `cost_usd` for `units` of a service at `unit_cost_usd`.
pub fn usd_cost(units: f64, unit_cost_usd: Option<f64>) -> f64 {
    unit_cost_usd.map(|rate| units * rate).unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
