//! Upload coordinator: durable commit to S3-compatible storage.
//!
//! Small artifacts go up in a single put; artifacts at or above the multipart
//! threshold are split into parts and aborted on any failure, so a failed
//! upload never leaves a partial object behind.
//!
//! Retry policy is expressed through [`Retryable`]:
//!
//! - throttling is retried here with exponential backoff and jitter, up to
//!   the configured attempt ceiling;
//! - anything else is returned as [`UploadError::Bufferable`] and the caller
//!   may retry once from a memory buffer.

mod backoff;
mod coordinator;
mod error;
mod s3;
mod traits;
mod types;

pub use backoff::BackoffPolicy;
pub use coordinator::UploadCoordinator;
pub use error::{is_throttle, Retryable, StoreError, UploadError, THROTTLE_CODES};
pub use s3::S3Store;
pub use traits::ObjectStore;
pub use types::{
    is_plain_md5, normalize_etag, ObjectMetadata, PartReceipt, UploadProgress, UploadReceipt,
    UploadTarget,
};
