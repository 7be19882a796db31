//! Per-group scratch directories.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::naming::{sanitize_filename, FALLBACK_GROUP};
use crate::transfer::CleanupWarning;

/// A directory that lives for one group.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Creates `<root>/<group>-<short id>`.
    pub async fn create(root: &Path, group: &str) -> std::io::Result<Self> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("{}-{}", sanitize_filename(group, FALLBACK_GROUP), &id[..8]);
        let path = root.join(name);
        tokio::fs::create_dir_all(&path).await?;
        debug!(path = %path.display(), "Created scratch directory");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the directory and anything left in it.
    pub async fn remove(self) -> Option<CleanupWarning> {
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed scratch directory");
                None
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => Some(CleanupWarning {
                path: self.path,
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_remove() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path(), "Anatomy: Week/1").await.unwrap();
        let path = scratch.path().to_path_buf();

        assert!(path.is_dir());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Anatomy Week1-"));

        tokio::fs::write(path.join("left.mp4"), b"x").await.unwrap();
        assert!(scratch.remove().await.is_none());
        assert!(!path.exists());
    }
}
