//! S3 backend.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;

use crate::error::StorageError;

/// Uploads images as public-read objects and serves them from a public
/// base URL (bucket website, CDN, or the bucket endpoint).
pub struct S3ImageStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3ImageStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url,
        }
    }

    /// Build a client from the standard AWS environment (credentials,
    /// region, endpoint overrides).
    pub async fn from_env(bucket: String, public_base_url: String) -> Self {
        let sdk_config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&sdk_config), bucket, public_base_url)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store `bytes` at `path`, returning the object key.
    pub async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<String, StorageError> {
        let key = object_key(path)?;
        let content_type = crate::content_type_for(&bytes);
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        tracing::info!(bucket = %self.bucket, key, size, content_type, "Uploaded image to S3");
        Ok(key.to_string())
    }

    pub fn public_url(&self, path: &str) -> String {
        myteacher_core::storage::public_url(&self.public_base_url, path)
    }
}

/// Validate and normalise an object key.
fn object_key(path: &str) -> Result<&str, StorageError> {
    let key = path.trim_start_matches('/');
    if key.is_empty() || key.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn leading_slash_is_dropped() {
        assert_eq!(object_key("/avatars/1/bust_happy_10.png").unwrap(), "avatars/1/bust_happy_10.png");
        assert_eq!(object_key("avatars/1/a.png").unwrap(), "avatars/1/a.png");
    }

    #[test]
    fn traversal_and_empty_keys_are_rejected() {
        assert_matches!(object_key("avatars/../secret"), Err(StorageError::InvalidPath(_)));
        assert_matches!(object_key("/"), Err(StorageError::InvalidPath(_)));
    }
}
