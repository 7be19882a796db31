//! Types for the resolver module.

use serde::{Deserialize, Serialize};

use crate::naming::extension_of;

/// One item to retrieve, as read from a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// The URL the item is reached through.
    pub entry_url: String,
    /// Title shown next to the link in the source listing.
    pub display_title: String,
    /// Extension hinted by the listing (without the dot).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hinted_extension: Option<String>,
    /// Filename that overrides whatever resolution suggests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_filename: Option<String>,
}

impl ResourceRef {
    pub fn new(entry_url: impl Into<String>, display_title: impl Into<String>) -> Self {
        Self {
            entry_url: entry_url.into(),
            display_title: display_title.into(),
            hinted_extension: None,
            fixed_filename: None,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        let ext = extension.into();
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.hinted_extension = if ext.is_empty() { None } else { Some(ext) };
        self
    }

    pub fn with_fixed_filename(mut self, filename: impl Into<String>) -> Self {
        self.fixed_filename = Some(filename.into());
        self
    }
}

/// What kind of bytes a transfer URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// A single progressive media file.
    Media,
    /// A streaming playlist that must be remuxed.
    Playlist,
    /// A document (slides, PDF, archive).
    Document,
    Unknown,
}

impl ContentKind {
    /// Guesses the kind from a filename or URL path.
    pub fn from_name(name: &str) -> Self {
        match extension_of(name).as_deref() {
            Some("mp4" | "mov" | "mkv" | "avi" | "webm" | "m4v" | "mp3" | "m4a") => Self::Media,
            Some("m3u8") => Self::Playlist,
            Some(
                "pdf" | "ppt" | "pptx" | "ppsm" | "pps" | "doc" | "docx" | "xls" | "xlsx" | "zip"
                | "txt",
            ) => Self::Document,
            _ => Self::Unknown,
        }
    }
}

/// A concrete, time-limited transfer URL plus what is needed to fetch it.
///
/// Consumed once by the transfer engine.
#[derive(Debug, Clone)]
pub struct ResolvedTransfer {
    pub transfer_url: String,
    /// Headers to send with the fetch, usually just `Cookie`.
    pub auth_headers: Vec<(String, String)>,
    pub suggested_filename: String,
    pub content_kind: ContentKind,
    /// Navigation trail of the landing page, outermost first.
    pub breadcrumbs: Vec<String>,
}

impl ResolvedTransfer {
    /// Returns the value of a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.auth_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_extension_normalizes() {
        let r = ResourceRef::new("https://x/a", "A").with_extension(".MP4");
        assert_eq!(r.hinted_extension.as_deref(), Some("mp4"));

        let r = ResourceRef::new("https://x/a", "A").with_extension("");
        assert!(r.hinted_extension.is_none());
    }

    #[test]
    fn test_content_kind_from_name() {
        assert_eq!(ContentKind::from_name("lecture.mp4"), ContentKind::Media);
        assert_eq!(ContentKind::from_name("master.m3u8"), ContentKind::Playlist);
        assert_eq!(ContentKind::from_name("slides.PPTX"), ContentKind::Document);
        assert_eq!(ContentKind::from_name("README"), ContentKind::Unknown);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let resolved = ResolvedTransfer {
            transfer_url: "https://x/v.mp4".to_string(),
            auth_headers: vec![("Cookie".to_string(), "a=1".to_string())],
            suggested_filename: "v.mp4".to_string(),
            content_kind: ContentKind::Media,
            breadcrumbs: vec![],
        };
        assert_eq!(resolved.header("cookie"), Some("a=1"));
        assert!(resolved.header("Authorization").is_none());
    }
}
