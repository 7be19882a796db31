//! Trait definitions for the upload module.

use async_trait::async_trait;
use bytes::Bytes;

use crate::transfer::ArtifactBody;

use super::error::StoreError;
use super::types::{PartReceipt, UploadTarget};

/// Minimal object store surface the coordinator needs.
///
/// Implementations make exactly one request per call; retrying is the
/// coordinator's job.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn name(&self) -> &str;

    /// Stores the whole body in one request. Returns the ETag, if any.
    async fn put_object(
        &self,
        target: &UploadTarget,
        body: &ArtifactBody,
        content_type: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Starts a multipart upload and returns its id.
    async fn create_multipart(
        &self,
        target: &UploadTarget,
        content_type: &str,
    ) -> Result<String, StoreError>;

    async fn upload_part(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        part_number: i32,
        bytes: Bytes,
    ) -> Result<PartReceipt, StoreError>;

    async fn complete_multipart(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        parts: &[PartReceipt],
    ) -> Result<Option<String>, StoreError>;

    async fn abort_multipart(&self, target: &UploadTarget, upload_id: &str) -> Result<(), StoreError>;
}
