//! REST API client for the Replicate prediction endpoints.
//!
//! Wraps `POST /predictions` and `GET /predictions/{id}` using [`reqwest`].

use serde::Deserialize;

/// Default base URL of the Replicate HTTP API.
pub const DEFAULT_API_URL: &str = "https://api.replicate.com/v1";

/// HTTP client for the Replicate API.
pub struct ReplicateApi {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
}

/// Lifecycle state of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    /// Whether the prediction has stopped changing.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// Prediction resource as returned by both endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl Prediction {
    /// First output URL: the first element of an array output, or a
    /// plain string output. Empty strings count as no output.
    pub fn first_output_url(&self) -> Option<&str> {
        let url = match self.output.as_ref()? {
            serde_json::Value::Array(items) => items.first()?.as_str()?,
            serde_json::Value::String(url) => url.as_str(),
            _ => return None,
        };
        (!url.is_empty()).then_some(url)
    }
}

/// Errors from the Replicate REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ReplicateApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Replicate returned a non-2xx status code.
    #[error("Replicate API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// No version id is configured for the requested model.
    #[error("No model version configured for '{0}'")]
    UnknownModel(String),
}

impl ReplicateApi {
    /// * `api_url` - Base URL, e.g. [`DEFAULT_API_URL`].
    pub fn new(api_url: String, api_token: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, api_token)
    }

    pub fn with_client(client: reqwest::Client, api_url: String, api_token: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_token,
        }
    }

    /// Create a prediction for a model version.
    pub async fn create_prediction(
        &self,
        version: &str,
        input: &serde_json::Value,
    ) -> Result<Prediction, ReplicateApiError> {
        let body = serde_json::json!({
            "version": version,
            "input": input,
        });

        let response = self
            .client
            .post(format!("{}/predictions", self.api_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the current state of a prediction.
    pub async fn get_prediction(&self, prediction_id: &str) -> Result<Prediction, ReplicateApiError> {
        let response = self
            .client
            .get(format!("{}/predictions/{}", self.api_url, prediction_id))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    fn auth_header(&self) -> String {
        format!("Token {}", self.api_token)
    }

    /// Return the response unchanged on 2xx, else an
    /// [`ReplicateApiError::ApiError`] with the status and body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ReplicateApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ReplicateApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ReplicateApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
