//! Error types for the resolver module.

use thiserror::Error;

use crate::session::SessionError;

/// Resolution failures. All of these skip the item, none stop the batch.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The landing page has no viewer link.
    #[error("No viewer link found on {url}")]
    NotFound { url: String },

    /// The delivery manifest never arrived.
    #[error("Delivery manifest not captured within {timeout_secs} seconds")]
    ManifestTimeout { timeout_secs: u64 },

    /// The delivery manifest was not the expected JSON.
    #[error("Malformed delivery manifest: {0}")]
    MalformedManifest(String),

    /// The manifest had no usable stream URL.
    #[error("Delivery manifest has no stream URL")]
    MissingStream,

    /// Navigation failed or timed out.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// The entry URL could not be parsed.
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A configured pattern did not compile.
    #[error("Invalid pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Any other browser failure during resolution.
    #[error(transparent)]
    Session(SessionError),
}

impl ResolveError {
    /// Short machine-friendly reason, used as a metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::ManifestTimeout { .. } => "manifest_timeout",
            Self::MalformedManifest(_) => "malformed_manifest",
            Self::MissingStream => "missing_stream",
            Self::Navigation(_) => "navigation",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::InvalidPattern { .. } => "invalid_pattern",
            Self::Session(e) if e.is_timeout() => "session_timeout",
            Self::Session(_) => "session",
        }
    }
}

impl From<SessionError> for ResolveError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Navigation { .. } | SessionError::NavigationTimeout { .. } => {
                Self::Navigation(err.to_string())
            }
            SessionError::ResponseTimeout { timeout_secs, .. } => {
                Self::ManifestTimeout { timeout_secs }
            }
            other => Self::Session(other),
        }
    }
}
