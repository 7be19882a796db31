//! Error types for the session module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the browser session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Neither an endpoint nor a profile directory was configured.
    #[error("No browser endpoint or profile directory configured")]
    NotConfigured,

    /// Attaching to a running browser failed.
    #[error("Failed to connect to browser at {endpoint}: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    /// Launching a browser against the profile failed.
    #[error("Failed to launch browser with profile {profile}: {reason}")]
    LaunchFailed { profile: PathBuf, reason: String },

    /// A new page could not be created.
    #[error("Failed to open page: {0}")]
    PageOpen(String),

    /// Navigation was aborted or refused.
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// Navigation did not finish in time.
    #[error("Navigation to {url} timed out after {timeout_secs} seconds")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    /// No matching network response arrived in time.
    #[error("No response matching {fragment} within {timeout_secs} seconds")]
    ResponseTimeout { fragment: String, timeout_secs: u64 },

    /// The response watcher stopped before a match.
    #[error("Response watch for {fragment} ended without a match")]
    WatchClosed { fragment: String },

    /// In-page script evaluation failed.
    #[error("Page script failed: {0}")]
    Script(String),

    /// The page action ran past the page lifetime bound.
    #[error("Page action exceeded {timeout_secs} seconds")]
    PageTimeout { timeout_secs: u64 },

    /// Any other DevTools protocol failure.
    #[error("Browser protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    /// Whether this error is a timeout of any kind.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::NavigationTimeout { .. } | Self::ResponseTimeout { .. } | Self::PageTimeout { .. }
        )
    }
}
