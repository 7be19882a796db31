//! Error types for the transfer module.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while retrieving bytes.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The request could not be sent or the body not read.
    #[error("Request failed: {0}")]
    Request(String),

    /// FFmpeg exited unsuccessfully.
    #[error("Remux failed: {message}")]
    RemuxFailed {
        message: String,
        stderr: Option<String>,
    },

    /// The operation ran past its bound.
    #[error("Transfer timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The FFmpeg binary is missing.
    #[error("FFmpeg not found at {path}")]
    FfmpegNotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    pub fn remux_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::RemuxFailed {
            message: message.into(),
            stderr,
        }
    }
}

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Http {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        Self::Request(err.to_string())
    }
}

/// A scratch file that could not be removed. Logged, never escalated.
#[derive(Debug)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not remove {}: {}", self.path.display(), self.reason)
    }
}
