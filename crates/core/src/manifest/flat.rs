//! Newline-delimited URL lists.

use crate::resolver::ResourceRef;

use super::types::ManifestEntry;

/// Parses one URL per line into `group`, skipping blanks and `#` comments.
pub fn parse_flat(text: &str, group: &str) -> Vec<ManifestEntry> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|url| ManifestEntry::new(group, ResourceRef::new(url, "")))
        .collect()
}
