//! Durable storage for generated avatar images.
//!
//! - [`s3::S3ImageStore`]: public-read objects in an S3 bucket.
//! - [`local::LocalImageStore`]: files under a local directory.
//! - [`fetch::HttpImageFetcher`]: downloads prediction outputs before upload.

pub mod error;
pub mod fetch;
pub mod local;
pub mod s3;

pub use error::StorageError;
pub use fetch::HttpImageFetcher;
pub use local::LocalImageStore;
pub use s3::S3ImageStore;

/// MIME type of an encoded image, sniffed from its leading bytes.
///
/// Unrecognised data is labelled `image/png`, the format the generators
/// produce.
pub fn content_type_for(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/png")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
