use std::time::Duration;

use myteacher_core::generation::{
    DEFAULT_CHAT_PRICING_MODEL, DEFAULT_DRAW_MODEL, DEFAULT_IMAGE_HEIGHT, DEFAULT_IMAGE_WIDTH,
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_SECS,
};

/// Run-time knobs of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Generation attempts per cell.
    pub max_retries: u32,
    /// Pause after a rejected attempt before the mitigated retry.
    pub retry_delay: Duration,
    pub image_width: u32,
    pub image_height: u32,
    /// Model used when the avatar has no `draw_model_version`.
    pub default_model: String,
    /// `service_type` under which comment generation is priced and audited.
    pub chat_pricing_model: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            image_width: DEFAULT_IMAGE_WIDTH,
            image_height: DEFAULT_IMAGE_HEIGHT,
            default_model: DEFAULT_DRAW_MODEL.to_string(),
            chat_pricing_model: DEFAULT_CHAT_PRICING_MODEL.to_string(),
        }
    }
}

impl PipelineConfig {
    /// `"{width}x{height}"` key for image pricing.
    pub fn image_size(&self) -> String {
        myteacher_core::pricing::image_size_string(self.image_width, self.image_height)
    }
}
