use async_trait::async_trait;
use myteacher_replicate::client::{PredictionOutput, ReplicateClient};

use crate::error::PortError;
use crate::ports::{BackgroundRemover, GenerationOptions, GenerationOutput, ImageGenerator};

fn into_output(output: PredictionOutput) -> GenerationOutput {
    GenerationOutput {
        url: output.url,
        prediction_id: output.prediction_id,
    }
}

#[async_trait]
impl ImageGenerator for ReplicateClient {
    async fn generate(
        &self,
        prompt: &str,
        seed: i64,
        options: &GenerationOptions,
    ) -> Result<Option<GenerationOutput>, PortError> {
        let output = self
            .generate_image(prompt, seed, &options.model, options.expression)
            .await?;
        Ok(output.map(into_output))
    }
}

#[async_trait]
impl BackgroundRemover for ReplicateClient {
    async fn remove_background(
        &self,
        image_url: &str,
    ) -> Result<Option<GenerationOutput>, PortError> {
        Ok(ReplicateClient::remove_background(self, image_url)
            .await?
            .map(into_output))
    }
}
