//! Artifact storage module
//!
//! Persists uploaded photo and document bytes on the local filesystem
//! under a configurable root, split into per-kind subdirectories.
//! Stored names are timestamp-prefixed so directory listings sort by
//! arrival order and never collide with the caller's filename.

use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::error::ApiError;

/// Artifact kind, mapped to a subdirectory under the storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Photo,
    Document,
}

impl ArtifactKind {
    fn subdir(self) -> &'static str {
        match self {
            Self::Photo => "photos",
            Self::Document => "documents",
        }
    }
}

/// A saved artifact: the generated name and its absolute-ish path.
#[derive(Debug, Clone)]
pub struct SavedArtifact {
    pub stored_name: String,
    pub path: PathBuf,
}

/// Filesystem-backed artifact store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Save artifact bytes, creating the kind subdirectory on demand.
    pub async fn save(
        &self,
        kind: ArtifactKind,
        original_name: &str,
        data: &[u8],
    ) -> Result<SavedArtifact, ApiError> {
        let dir = self.root.join(kind.subdir());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create upload dir: {e}")))?;

        let stored_name = stored_name(original_name);
        let path = dir.join(&stored_name);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to write artifact: {e}")))?;

        Ok(SavedArtifact { stored_name, path })
    }

    /// Read a stored artifact back by its persisted path.
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, ApiError> {
        tokio::fs::read(path)
            .await
            .map_err(|_| ApiError::not_found("Stored file not found"))
    }

    /// Remove a stored artifact. Failures are logged and swallowed:
    /// cleanup must never mask the outcome the caller is reporting.
    pub async fn remove(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove artifact");
        }
    }
}

/// Millisecond timestamp + short random suffix + original extension.
fn stored_name(original_name: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    format!("{}-{}.{}", Utc::now().timestamp_millis(), suffix, ext)
}
