/// Errors from image storage and download.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Download of {url} failed with status {status}")]
    DownloadStatus { url: String, status: u16 },

    #[error("Downloaded image from {0} is empty")]
    EmptyBody(String),
}
