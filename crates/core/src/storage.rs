//! Storage backend names and avatar image path rules.

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// S3-compatible object storage.
pub const BACKEND_S3: &str = "s3";

/// Local filesystem directory.
pub const BACKEND_LOCAL: &str = "local";

const VALID_BACKENDS: &[&str] = &[BACKEND_S3, BACKEND_LOCAL];

/// Validate a configured storage backend name.
pub fn validate_backend(backend: &str) -> Result<(), CoreError> {
    if VALID_BACKENDS.contains(&backend) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid storage backend '{backend}'. Must be one of: {VALID_BACKENDS:?}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Object key for a generated avatar image.
///
/// `avatars/{user_id}/{pose}_{expression}_{unix_ts}.png`
pub fn upload_path(user_id: DbId, pose_type: &str, expression_type: &str, unix_ts: i64) -> String {
    format!("avatars/{user_id}/{pose_type}_{expression_type}_{unix_ts}.png")
}

/// Public URL of `path` under `base_url`.
pub fn public_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
