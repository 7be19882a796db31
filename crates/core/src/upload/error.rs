//! Error types for the upload module.

use thiserror::Error;

/// How a failed store call may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryable {
    /// Do not retry.
    None,
    /// Retry the same call after an exponential delay.
    Backoff,
    /// Give up internally; the caller may retry once from a memory buffer.
    BufferedRetry,
}

/// Failure of a single object store call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store asked us to slow down.
    #[error("{operation} throttled ({code}): {message}")]
    Throttled {
        operation: &'static str,
        code: String,
        message: String,
    },

    /// Any other service-side failure.
    #[error("{operation} failed (status {status:?}, code {code:?}): {message}")]
    Service {
        operation: &'static str,
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    /// The request body could not be streamed.
    #[error("Failed to stream body: {0}")]
    Body(String),

    /// The returned ETag does not match the body we sent.
    #[error("ETag mismatch: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },
}

impl StoreError {
    pub fn retry_class(&self) -> Retryable {
        match self {
            Self::Throttled { .. } => Retryable::Backoff,
            Self::Service { .. } | Self::Body(_) | Self::Integrity { .. } => {
                Retryable::BufferedRetry
            }
        }
    }
}

/// Error codes S3 and compatible stores use for rate limiting.
pub const THROTTLE_CODES: &[&str] = &[
    "SlowDown",
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequests",
];

/// Whether an error code or HTTP status means "slow down".
pub fn is_throttle(code: Option<&str>, status: Option<u16>) -> bool {
    code.is_some_and(|c| THROTTLE_CODES.contains(&c)) || matches!(status, Some(429 | 503))
}

/// Failure of a whole upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Still throttled after the last allowed attempt.
    #[error("Upload of {key} still rate limited after {attempts} attempts")]
    RateLimited { key: String, attempts: u32 },

    /// Failed in a way a buffered retry may fix.
    #[error("Upload of {key} failed: {source}")]
    Bufferable {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The artifact could not be read.
    #[error("Cannot read artifact for {key}: {source}")]
    Source {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    pub fn retryable(&self) -> Retryable {
        match self {
            Self::RateLimited { .. } | Self::Source { .. } => Retryable::None,
            Self::Bufferable { .. } => Retryable::BufferedRetry,
        }
    }
}
