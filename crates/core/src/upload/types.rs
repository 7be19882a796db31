//! Types for the upload module.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// User metadata attached to every stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub source_url: String,
    pub title: String,
    pub uploaded_at: DateTime<Utc>,
}

impl ObjectMetadata {
    pub fn new(source_url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            title: title.into(),
            uploaded_at: Utc::now(),
        }
    }

    /// Header-safe key/value pairs.
    ///
    /// Object metadata travels as HTTP headers, so non-ASCII values are
    /// percent-encoded.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let encode = |v: &str| {
            if v.is_ascii() && !v.chars().any(|c| c.is_ascii_control()) {
                v.to_string()
            } else {
                urlencoding::encode(v).into_owned()
            }
        };
        vec![
            ("source-url".to_string(), encode(&self.source_url)),
            ("title".to_string(), encode(&self.title)),
            (
                "uploaded-at".to_string(),
                self.uploaded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ]
    }
}

/// Where an artifact is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub bucket: String,
    pub key: String,
    pub metadata: ObjectMetadata,
}

/// A finished multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartReceipt {
    pub part_number: i32,
    pub etag: Option<String>,
}

/// Progress of a multipart upload. Observational only.
#[derive(Debug, Clone, Serialize)]
pub struct UploadProgress {
    pub key: String,
    pub bytes_sent: u64,
    pub total_bytes: Option<u64>,
}

/// Result of a committed upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub key: String,
    pub etag: Option<String>,
    pub size_bytes: u64,
    pub attempts: u32,
    pub multipart: bool,
}

/// Strips the quotes S3 wraps ETags in.
pub fn normalize_etag(etag: &str) -> &str {
    etag.trim().trim_matches('"')
}

/// Whether an ETag is a plain MD5 digest (not a multipart or KMS tag).
pub fn is_plain_md5(etag: &str) -> bool {
    let etag = normalize_etag(etag);
    etag.len() == 32 && etag.chars().all(|c| c.is_ascii_hexdigit())
}
