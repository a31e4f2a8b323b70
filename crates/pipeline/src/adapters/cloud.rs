use async_trait::async_trait;
use myteacher_cloud::{HttpImageFetcher, LocalImageStore, S3ImageStore};

use crate::error::PortError;
use crate::ports::{ImageFetcher, ImageStore};

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<String, PortError> {
        Ok(S3ImageStore::upload(self, bytes, path).await?)
    }

    fn public_url(&self, path: &str) -> String {
        S3ImageStore::public_url(self, path)
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<String, PortError> {
        Ok(LocalImageStore::upload(self, bytes, path).await?)
    }

    fn public_url(&self, path: &str) -> String {
        LocalImageStore::public_url(self, path)
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PortError> {
        Ok(HttpImageFetcher::fetch(self, url).await?)
    }
}
