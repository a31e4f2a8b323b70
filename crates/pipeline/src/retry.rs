//! Bounded generation attempts with prompt mitigation.

use std::sync::Arc;
use std::time::Duration;

use myteacher_core::catalog::Expression;
use myteacher_core::mitigation::{MitigationEngine, MAX_MITIGATION_LEVEL};

use crate::ports::{GenerationOptions, ImageGenerator};

/// Result of a successful cell generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSuccess {
    pub url: String,
    pub prediction_id: String,
    /// Prompt that produced the image.
    pub prompt: String,
    /// 0-based index of the successful attempt.
    pub attempt: u32,
    pub mitigated: bool,
}

/// Runs up to `max_retries` attempts for one cell.
///
/// A rejection (no image) switches to the next mitigation level of the
/// original prompt and waits `retry_delay`, unless it was the last
/// attempt. A collaborator error only consumes the attempt.
pub struct GenerationRetrier {
    generator: Arc<dyn ImageGenerator>,
    mitigation: Arc<MitigationEngine>,
    max_retries: u32,
    retry_delay: Duration,
}

impl GenerationRetrier {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        mitigation: Arc<MitigationEngine>,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            generator,
            mitigation,
            max_retries,
            retry_delay,
        }
    }

    pub async fn generate_with_retry(
        &self,
        prompt: &str,
        seed: i64,
        expression: Expression,
        pose_type: &str,
        model: &str,
    ) -> Option<GenerationSuccess> {
        let options = GenerationOptions {
            model: model.to_string(),
            expression,
        };
        let mut current = prompt.to_string();
        let mut mitigated = false;

        for attempt in 0..self.max_retries {
            match self.generator.generate(&current, seed, &options).await {
                Ok(Some(output)) => {
                    if attempt > 0 {
                        tracing::info!(
                            pose_type,
                            expression_type = %expression,
                            attempt,
                            mitigated,
                            "Generation succeeded after retry"
                        );
                    }
                    return Some(GenerationSuccess {
                        url: output.url,
                        prediction_id: output.prediction_id,
                        prompt: current,
                        attempt,
                        mitigated,
                    });
                }
                Ok(None) => {
                    tracing::warn!(
                        pose_type,
                        expression_type = %expression,
                        attempt,
                        "Generation returned no image"
                    );
                    if attempt + 1 < self.max_retries {
                        let level = (attempt + 1).min(MAX_MITIGATION_LEVEL);
                        current = self.mitigation.mitigate(prompt, expression, level);
                        mitigated = true;
                        tracing::debug!(
                            pose_type,
                            expression_type = %expression,
                            level,
                            prompt = %current,
                            "Retrying with mitigated prompt"
                        );
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        pose_type,
                        expression_type = %expression,
                        attempt,
                        error = %e,
                        "Generation request failed"
                    );
                }
            }
        }

        tracing::error!(
            pose_type,
            expression_type = %expression,
            max_retries = self.max_retries,
            "Generation attempts exhausted"
        );
        None
    }
}
