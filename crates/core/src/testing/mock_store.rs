//! Mock object store for testing.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::transfer::ArtifactBody;
use crate::upload::{ObjectStore, PartReceipt, StoreError, UploadTarget};

/// An object committed to the mock store.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub bytes: Bytes,
    pub content_type: String,
    pub metadata: Vec<(String, String)>,
    /// Number of parts, 0 for a single put.
    pub parts: usize,
}

#[derive(Debug)]
struct PendingUpload {
    content_type: String,
    parts: BTreeMap<i32, Bytes>,
}

#[derive(Debug, Default)]
struct StoreState {
    objects: Vec<StoredObject>,
    pending: HashMap<String, PendingUpload>,
    throttle_remaining: u32,
    fail_remaining: u32,
    fail_part: Option<i32>,
    corrupt_etags: bool,
    put_calls: u32,
    aborted: Vec<String>,
    next_upload_id: u32,
}

impl StoreState {
    /// Consumes one scripted failure, if any is pending.
    fn scripted_failure(&mut self, operation: &'static str) -> Option<StoreError> {
        if self.throttle_remaining > 0 {
            self.throttle_remaining -= 1;
            return Some(StoreError::Throttled {
                operation,
                code: "SlowDown".to_string(),
                message: "Please reduce your request rate.".to_string(),
            });
        }
        if self.fail_remaining > 0 {
            self.fail_remaining -= 1;
            return Some(StoreError::Service {
                operation,
                status: Some(500),
                code: Some("InternalError".to_string()),
                message: "mock failure".to_string(),
            });
        }
        None
    }

    fn commit(&mut self, object: StoredObject) {
        self.objects
            .retain(|o| !(o.bucket == object.bucket && o.key == object.key));
        self.objects.push(object);
    }

    fn etag_for(&self, bytes: &[u8]) -> String {
        if self.corrupt_etags {
            format!("\"{}\"", "0".repeat(32))
        } else {
            format!("\"{:x}\"", md5::compute(bytes))
        }
    }
}

/// In-memory implementation of the ObjectStore trait.
///
/// Provides controllable behavior for testing:
/// - Throttle or fail the next N calls
/// - Fail a specific multipart part
/// - Return ETags that do not match the body
///
/// Writing an existing key replaces it, like S3.
///
/// # Example
///
/// ```rust,ignore
/// let store = MockStore::new();
/// store.throttle_next(2).await;
///
/// let coordinator = UploadCoordinator::new(Arc::new(store.clone()), &config.storage);
/// coordinator.upload(&target, &artifact).await?;
///
/// assert_eq!(store.put_calls().await, 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    state: Arc<RwLock<StoreState>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers the next `n` calls with a throttling error.
    pub async fn throttle_next(&self, n: u32) {
        self.state.write().await.throttle_remaining = n;
    }

    /// Answers the next `n` calls with a non-throttling service error.
    pub async fn fail_next(&self, n: u32) {
        self.state.write().await.fail_remaining = n;
    }

    /// Fails every upload of the given part number.
    pub async fn fail_part(&self, part_number: i32) {
        self.state.write().await.fail_part = Some(part_number);
    }

    pub async fn corrupt_etags(&self, corrupt: bool) {
        self.state.write().await.corrupt_etags = corrupt;
    }

    pub async fn objects(&self) -> Vec<StoredObject> {
        self.state.read().await.objects.clone()
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.state
            .read()
            .await
            .objects
            .iter()
            .find(|o| o.key == key)
            .cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .objects
            .iter()
            .map(|o| o.key.clone())
            .collect()
    }

    /// Number of `put_object` calls, failed ones included.
    pub async fn put_calls(&self) -> u32 {
        self.state.read().await.put_calls
    }

    /// Keys whose multipart upload was aborted.
    pub async fn aborted(&self) -> Vec<String> {
        self.state.read().await.aborted.clone()
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn put_object(
        &self,
        target: &UploadTarget,
        body: &ArtifactBody,
        content_type: &str,
    ) -> Result<Option<String>, StoreError> {
        {
            let mut state = self.state.write().await;
            state.put_calls += 1;
            if let Some(err) = state.scripted_failure("PutObject") {
                return Err(err);
            }
        }

        let bytes = match body {
            ArtifactBody::Memory(bytes) => bytes.clone(),
            ArtifactBody::File(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| StoreError::Body(e.to_string()))?,
        };

        let mut state = self.state.write().await;
        let etag = state.etag_for(&bytes);
        state.commit(StoredObject {
            bucket: target.bucket.clone(),
            key: target.key.clone(),
            bytes,
            content_type: content_type.to_string(),
            metadata: target.metadata.to_pairs(),
            parts: 0,
        });
        Ok(Some(etag))
    }

    async fn create_multipart(
        &self,
        _target: &UploadTarget,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let mut state = self.state.write().await;
        if let Some(err) = state.scripted_failure("CreateMultipartUpload") {
            return Err(err);
        }
        state.next_upload_id += 1;
        let upload_id = format!("upload-{}", state.next_upload_id);
        state.pending.insert(
            upload_id.clone(),
            PendingUpload {
                content_type: content_type.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        _target: &UploadTarget,
        upload_id: &str,
        part_number: i32,
        bytes: Bytes,
    ) -> Result<PartReceipt, StoreError> {
        let mut state = self.state.write().await;
        if let Some(err) = state.scripted_failure("UploadPart") {
            return Err(err);
        }
        if state.fail_part == Some(part_number) {
            return Err(StoreError::Service {
                operation: "UploadPart",
                status: Some(500),
                code: Some("InternalError".to_string()),
                message: format!("mock failure on part {}", part_number),
            });
        }
        let etag = format!("\"{:x}\"", md5::compute(&bytes));
        let pending = state
            .pending
            .get_mut(upload_id)
            .ok_or_else(|| StoreError::Service {
                operation: "UploadPart",
                status: Some(404),
                code: Some("NoSuchUpload".to_string()),
                message: upload_id.to_string(),
            })?;
        pending.parts.insert(part_number, bytes);
        Ok(PartReceipt {
            part_number,
            etag: Some(etag),
        })
    }

    async fn complete_multipart(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        parts: &[PartReceipt],
    ) -> Result<Option<String>, StoreError> {
        let mut state = self.state.write().await;
        if let Some(err) = state.scripted_failure("CompleteMultipartUpload") {
            return Err(err);
        }
        let pending = state
            .pending
            .remove(upload_id)
            .ok_or_else(|| StoreError::Service {
                operation: "CompleteMultipartUpload",
                status: Some(404),
                code: Some("NoSuchUpload".to_string()),
                message: upload_id.to_string(),
            })?;

        let mut body = BytesMut::new();
        for receipt in parts {
            let part = pending
                .parts
                .get(&receipt.part_number)
                .ok_or_else(|| StoreError::Service {
                    operation: "CompleteMultipartUpload",
                    status: Some(400),
                    code: Some("InvalidPart".to_string()),
                    message: format!("part {} was never uploaded", receipt.part_number),
                })?;
            body.extend_from_slice(part);
        }
        let bytes = body.freeze();
        let etag = format!("\"{:x}-{}\"", md5::compute(&bytes), parts.len());

        state.commit(StoredObject {
            bucket: target.bucket.clone(),
            key: target.key.clone(),
            bytes,
            content_type: pending.content_type,
            metadata: target.metadata.to_pairs(),
            parts: parts.len(),
        });
        Ok(Some(etag))
    }

    async fn abort_multipart(&self, target: &UploadTarget, upload_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.pending.remove(upload_id);
        state.aborted.push(target.key.clone());
        Ok(())
    }
}
