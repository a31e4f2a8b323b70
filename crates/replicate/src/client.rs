//! High-level Replicate client used by the avatar pipeline.
//!
//! [`ReplicateClient`] resolves model names to version ids, submits
//! predictions, and polls them to completion. A prediction that ends in
//! `failed` or `canceled`, or never finishes within the polling budget,
//! yields `Ok(None)`: the caller treats it as a rejection rather than a
//! transport failure.

use std::collections::HashMap;
use std::time::Duration;

use myteacher_core::catalog::Expression;

use crate::api::{Prediction, PredictionStatus, ReplicateApi, ReplicateApiError};
use crate::input;

/// Default number of status polls before giving up.
pub const DEFAULT_MAX_POLLING_ATTEMPTS: u32 = 60;
/// Default delay between status polls.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(2);

/// Deployment-specific client settings.
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    /// Model name (e.g. `anything-v4.0`) -> version id.
    pub model_versions: HashMap<String, String>,
    /// Version used for unknown model names.
    pub default_version: Option<String>,
    /// Version of the background removal model.
    pub transparent_version: Option<String>,
    pub max_polling_attempts: u32,
    pub polling_interval: Duration,
    pub width: u32,
    pub height: u32,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            model_versions: HashMap::new(),
            default_version: None,
            transparent_version: None,
            max_polling_attempts: DEFAULT_MAX_POLLING_ATTEMPTS,
            polling_interval: DEFAULT_POLLING_INTERVAL,
            width: myteacher_core::generation::DEFAULT_IMAGE_WIDTH,
            height: myteacher_core::generation::DEFAULT_IMAGE_HEIGHT,
        }
    }
}

impl ReplicateConfig {
    /// Version id for `model`, falling back to the default version.
    pub fn version_for(&self, model: &str) -> Option<&str> {
        self.model_versions
            .get(model)
            .or(self.default_version.as_ref())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// A finished prediction with a usable output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionOutput {
    pub url: String,
    pub prediction_id: String,
}

/// Generation and background removal over the Replicate API.
pub struct ReplicateClient {
    api: ReplicateApi,
    config: ReplicateConfig,
}

impl ReplicateClient {
    pub fn new(api: ReplicateApi, config: ReplicateConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &ReplicateConfig {
        &self.config
    }

    /// Generate one image of `prompt` with `model`.
    pub async fn generate_image(
        &self,
        prompt: &str,
        seed: i64,
        model: &str,
        expression: Expression,
    ) -> Result<Option<PredictionOutput>, ReplicateApiError> {
        let version = self
            .config
            .version_for(model)
            .ok_or_else(|| ReplicateApiError::UnknownModel(model.to_string()))?;

        let params = input::sampling_for(model, expression, self.config.width, self.config.height);
        tracing::info!(
            model,
            seed,
            expression = %expression,
            guidance_scale = params.guidance_scale,
            num_inference_steps = params.num_inference_steps,
            "Submitting image generation"
        );

        let prediction = self
            .api
            .create_prediction(version, &input::generation_input(prompt, seed, &params))
            .await?;
        self.wait_for_completion(prediction, "draw").await
    }

    /// Remove the background of the image at `image_url`.
    pub async fn remove_background(
        &self,
        image_url: &str,
    ) -> Result<Option<PredictionOutput>, ReplicateApiError> {
        let version = self
            .config
            .transparent_version
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ReplicateApiError::UnknownModel("rembg".to_string()))?;

        tracing::info!(image_url, "Submitting background removal");
        let prediction = self
            .api
            .create_prediction(version, &input::background_removal_input(image_url))
            .await?;
        self.wait_for_completion(prediction, "transparent").await
    }

    /// Poll until the prediction finishes or the polling budget runs out.
    ///
    /// Transport errors while polling consume an attempt; a non-2xx status
    /// response aborts with an error.
    async fn wait_for_completion(
        &self,
        created: Prediction,
        kind: &'static str,
    ) -> Result<Option<PredictionOutput>, ReplicateApiError> {
        let prediction_id = created.id;
        tracing::debug!(prediction_id = %prediction_id, kind, "Prediction created");

        for attempt in 0..self.config.max_polling_attempts {
            tokio::time::sleep(self.config.polling_interval).await;

            let prediction = match self.api.get_prediction(&prediction_id).await {
                Ok(p) => p,
                Err(ReplicateApiError::Request(e)) => {
                    tracing::warn!(prediction_id = %prediction_id, kind, attempt, error = %e, "Polling error");
                    continue;
                }
                Err(e) => return Err(e),
            };

            match prediction.status {
                PredictionStatus::Succeeded => {
                    let Some(url) = prediction.first_output_url() else {
                        tracing::error!(prediction_id = %prediction_id, kind, "Prediction succeeded without output URL");
                        return Ok(None);
                    };
                    tracing::info!(prediction_id = %prediction_id, kind, url, "Prediction completed");
                    return Ok(Some(PredictionOutput {
                        url: url.to_string(),
                        prediction_id,
                    }));
                }
                PredictionStatus::Failed | PredictionStatus::Canceled => {
                    tracing::warn!(
                        prediction_id = %prediction_id,
                        kind,
                        status = ?prediction.status,
                        error = ?prediction.error,
                        "Prediction did not succeed"
                    );
                    return Ok(None);
                }
                _ => {}
            }
        }

        tracing::error!(prediction_id = %prediction_id, kind, "Prediction polling timed out");
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
