//! Local filesystem backend.
//!
//! Files are laid out exactly like the object keys, e.g.
//! `{root}/avatars/{user_id}/{pose}_{expression}_{ts}.png`.

use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;

pub struct LocalImageStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` to `path` under the root, returning `path`.
    ///
    /// Writes go to a temp file that is then renamed over the target, so
    /// readers never see a partial image.
    pub async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<String, StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = target.with_extension("tmp");
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &target).await?;

        tracing::info!(path = %target.display(), size = bytes.len(), "Stored image on disk");
        Ok(path.trim_start_matches('/').to_string())
    }

    pub fn public_url(&self, path: &str) -> String {
        myteacher_core::storage::public_url(&self.public_base_url, path)
    }

    /// Join a relative storage path onto the root, refusing anything that
    /// would escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path.trim_start_matches('/'));
        let only_normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !only_normal || relative.as_os_str().is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
