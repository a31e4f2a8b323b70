//! Download of generated images before they are re-uploaded.

use std::time::Duration;

use crate::error::StorageError;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// GET `url` and return the body. Non-2xx and empty bodies are errors.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::DownloadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(StorageError::EmptyBody(url.to_string()));
        }
        tracing::debug!(url, size = bytes.len(), "Downloaded image");
        Ok(bytes.to_vec())
    }
}
