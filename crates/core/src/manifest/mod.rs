//! Manifest sources, flattened into ordered `(group, resource)` entries.
//!
//! Three formats are accepted: a hierarchical JSON tree ([`parse_tree`]), a
//! flat URL list ([`parse_flat`]) and a keyed batch source ([`parse_keyed`]).
//! Order is always preserved; nothing is deduplicated or reordered.

mod error;
mod flat;
mod keyed;
mod tree;
mod types;

use std::path::Path;

pub use error::ManifestError;
pub use flat::parse_flat;
pub use keyed::parse_keyed;
pub use tree::parse_tree;
pub use types::{group_entries, Group, ManifestEntry};

/// Which parser a manifest file goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Tree,
    Flat,
    Keyed,
}

/// Reads and parses a manifest file.
///
/// `default_group` is only used by flat lists.
pub async fn load_manifest(
    path: &Path,
    kind: ManifestKind,
    default_group: &str,
) -> Result<Vec<ManifestEntry>, ManifestError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let entries = match kind {
        ManifestKind::Tree => parse_tree(&text)?,
        ManifestKind::Flat => parse_flat(&text, default_group),
        ManifestKind::Keyed => parse_keyed(&text)?,
    };
    tracing::info!(
        path = %path.display(),
        kind = ?kind,
        entries = entries.len(),
        "Loaded manifest"
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load_manifest(Path::new("/nonexistent/urls.txt"), ManifestKind::Flat, "g")
            .await
            .unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }

    #[tokio::test]
    async fn test_load_flat_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        tokio::fs::write(&path, "https://x/a\nhttps://x/b\n").await.unwrap();

        let entries = load_manifest(&path, ManifestKind::Flat, "downloads")
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].group, "downloads");
    }
}
