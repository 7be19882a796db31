//! Commits artifacts to the object store with retry.

use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::metrics;
use crate::transfer::{ArtifactBody, TransferArtifact};

use super::backoff::BackoffPolicy;
use super::error::{Retryable, StoreError, UploadError};
use super::traits::ObjectStore;
use super::types::{is_plain_md5, normalize_etag, PartReceipt, UploadProgress, UploadReceipt, UploadTarget};

/// Reads an artifact in fixed-size parts.
enum PartSource {
    Memory { bytes: Bytes, offset: usize },
    File(tokio::fs::File),
}

impl PartSource {
    async fn next_part(&mut self, part_size: usize) -> std::io::Result<Option<Bytes>> {
        match self {
            Self::Memory { bytes, offset } => {
                if *offset >= bytes.len() {
                    return Ok(None);
                }
                let end = (*offset + part_size).min(bytes.len());
                let part = bytes.slice(*offset..end);
                *offset = end;
                Ok(Some(part))
            }
            Self::File(file) => {
                let mut buf = Vec::with_capacity(part_size);
                (&mut *file).take(part_size as u64).read_to_end(&mut buf).await?;
                if buf.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Bytes::from(buf)))
                }
            }
        }
    }
}

pub struct UploadCoordinator {
    store: Arc<dyn ObjectStore>,
    backoff: BackoffPolicy,
    multipart_threshold: u64,
    part_size: usize,
    progress_tx: Option<mpsc::Sender<UploadProgress>>,
}

impl UploadCoordinator {
    pub fn new(store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            backoff: BackoffPolicy::new(&config.retry),
            multipart_threshold: config.multipart_threshold_bytes,
            part_size: config.part_size_bytes.max(1) as usize,
            progress_tx: None,
        }
    }

    /// Also sends each multipart progress observation on `tx`.
    pub fn with_progress(mut self, tx: mpsc::Sender<UploadProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Commits `artifact` under `target`.
    ///
    /// Throttling is retried here with backoff. Other store failures are
    /// returned as [`UploadError::Bufferable`] without retrying.
    pub async fn upload(
        &self,
        target: &UploadTarget,
        artifact: &TransferArtifact,
    ) -> Result<UploadReceipt, UploadError> {
        let result = if artifact.size_bytes >= self.multipart_threshold {
            self.upload_multipart(target, artifact).await
        } else {
            self.upload_single(target, artifact).await
        };

        match &result {
            Ok(receipt) => {
                metrics::UPLOADED_BYTES.inc_by(receipt.size_bytes);
                info!(
                    key = %receipt.key,
                    size_bytes = receipt.size_bytes,
                    attempts = receipt.attempts,
                    multipart = receipt.multipart,
                    "Upload committed"
                );
            }
            Err(e) => warn!(key = %target.key, error = %e, "Upload failed"),
        }
        result
    }

    async fn upload_single(
        &self,
        target: &UploadTarget,
        artifact: &TransferArtifact,
    ) -> Result<UploadReceipt, UploadError> {
        let (etag, attempts) = self
            .with_backoff(&target.key, || {
                self.store
                    .put_object(target, &artifact.body, &artifact.content_type)
            })
            .await?;

        if let (ArtifactBody::Memory(bytes), Some(tag)) = (&artifact.body, etag.as_deref()) {
            if is_plain_md5(tag) {
                let expected = format!("{:x}", md5::compute(bytes));
                let actual = normalize_etag(tag);
                if !actual.eq_ignore_ascii_case(&expected) {
                    return Err(UploadError::Bufferable {
                        key: target.key.clone(),
                        source: StoreError::Integrity {
                            expected,
                            actual: actual.to_string(),
                        },
                    });
                }
            }
        }

        Ok(UploadReceipt {
            key: target.key.clone(),
            etag,
            size_bytes: artifact.size_bytes,
            attempts,
            multipart: false,
        })
    }

    async fn upload_multipart(
        &self,
        target: &UploadTarget,
        artifact: &TransferArtifact,
    ) -> Result<UploadReceipt, UploadError> {
        let (upload_id, mut attempts) = self
            .with_backoff(&target.key, || {
                self.store.create_multipart(target, &artifact.content_type)
            })
            .await?;
        debug!(key = %target.key, upload_id = %upload_id, "Multipart upload started");

        let outcome = async {
            let (parts, part_attempts) = self.send_parts(target, &upload_id, artifact).await?;
            let (etag, complete_attempts) = self
                .with_backoff(&target.key, || {
                    self.store.complete_multipart(target, &upload_id, &parts)
                })
                .await?;
            Ok::<_, UploadError>((etag, part_attempts + complete_attempts))
        }
        .await;

        match outcome {
            Ok((etag, more)) => {
                attempts += more;
                Ok(UploadReceipt {
                    key: target.key.clone(),
                    etag,
                    size_bytes: artifact.size_bytes,
                    attempts,
                    multipart: true,
                })
            }
            Err(e) => {
                // No partial object may survive a failed upload.
                if let Err(abort_err) = self.store.abort_multipart(target, &upload_id).await {
                    warn!(key = %target.key, error = %abort_err, "Failed to abort multipart upload");
                } else {
                    debug!(key = %target.key, "Multipart upload aborted");
                }
                Err(e)
            }
        }
    }

    async fn send_parts(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        artifact: &TransferArtifact,
    ) -> Result<(Vec<PartReceipt>, u32), UploadError> {
        let source_err = |source: std::io::Error| UploadError::Source {
            key: target.key.clone(),
            source,
        };

        let mut source = match &artifact.body {
            ArtifactBody::Memory(bytes) => PartSource::Memory {
                bytes: bytes.clone(),
                offset: 0,
            },
            ArtifactBody::File(path) => {
                PartSource::File(tokio::fs::File::open(path).await.map_err(source_err)?)
            }
        };

        let mut parts = Vec::new();
        let mut attempts = 0;
        let mut bytes_sent: u64 = 0;
        let mut part_number: i32 = 1;

        while let Some(chunk) = source.next_part(self.part_size).await.map_err(source_err)? {
            let len = chunk.len() as u64;
            let (receipt, tries) = self
                .with_backoff(&target.key, || {
                    self.store
                        .upload_part(target, upload_id, part_number, chunk.clone())
                })
                .await?;
            parts.push(receipt);
            attempts += tries;
            bytes_sent += len;
            part_number += 1;

            self.report_progress(UploadProgress {
                key: target.key.clone(),
                bytes_sent,
                total_bytes: Some(artifact.size_bytes),
            });
        }

        Ok((parts, attempts))
    }

    fn report_progress(&self, progress: UploadProgress) {
        debug!(
            key = %progress.key,
            bytes_sent = progress.bytes_sent,
            total_bytes = ?progress.total_bytes,
            "Upload progress"
        );
        if let Some(ref tx) = self.progress_tx {
            let _ = tx.try_send(progress);
        }
    }

    /// Runs `op` until it succeeds, retrying only throttling responses.
    ///
    /// Returns the value and the number of attempts used.
    async fn with_backoff<T, F, Fut>(&self, key: &str, mut op: F) -> Result<(T, u32), UploadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 1;
        loop {
            let err = match op().await {
                Ok(value) => {
                    metrics::UPLOAD_ATTEMPTS.with_label_values(&["success"]).inc();
                    return Ok((value, attempt));
                }
                Err(e) => e,
            };

            match err.retry_class() {
                Retryable::Backoff => {
                    metrics::UPLOAD_ATTEMPTS.with_label_values(&["throttled"]).inc();
                    if attempt >= self.backoff.max_attempts {
                        return Err(UploadError::RateLimited {
                            key: key.to_string(),
                            attempts: attempt,
                        });
                    }
                    let delay = self.backoff.delay_for(attempt);
                    warn!(
                        key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Store throttled, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Retryable::BufferedRetry | Retryable::None => {
                    metrics::UPLOAD_ATTEMPTS.with_label_values(&["error"]).inc();
                    return Err(UploadError::Bufferable {
                        key: key.to_string(),
                        source: err,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::testing::MockStore;
    use crate::upload::ObjectMetadata;

    fn config(threshold: u64, part: u64) -> StorageConfig {
        StorageConfig {
            bucket: Some("lectures".to_string()),
            region: Some("eu-west-1".to_string()),
            multipart_threshold_bytes: threshold,
            part_size_bytes: part,
            retry: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 1,
                jitter_ms: 0,
            },
            ..Default::default()
        }
    }

    fn target(key: &str) -> UploadTarget {
        UploadTarget {
            bucket: "lectures".to_string(),
            key: key.to_string(),
            metadata: ObjectMetadata::new("https://x/a.mp4", "A"),
        }
    }

    #[tokio::test]
    async fn test_single_put_from_memory() {
        let store = MockStore::new();
        let coordinator = UploadCoordinator::new(Arc::new(store.clone()), &config(1024, 8));
        let artifact = TransferArtifact::in_memory(Bytes::from_static(b"hello"), "text/plain");

        let receipt = coordinator.upload(&target("g/a.txt"), &artifact).await.unwrap();
        assert_eq!(receipt.attempts, 1);
        assert!(!receipt.multipart);

        let objects = store.objects().await;
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "g/a.txt");
        assert_eq!(&objects[0].bytes[..], b"hello");
        assert!(objects[0].metadata.iter().any(|(k, _)| k == "uploaded-at"));
    }

    #[tokio::test]
    async fn test_throttle_then_success() {
        let store = MockStore::new();
        store.throttle_next(2).await;
        let coordinator = UploadCoordinator::new(Arc::new(store.clone()), &config(1024, 8));
        let artifact = TransferArtifact::in_memory(Bytes::from_static(b"x"), "text/plain");

        let receipt = coordinator.upload(&target("g/x"), &artifact).await.unwrap();
        assert_eq!(receipt.attempts, 3);
        assert_eq!(store.objects().await.len(), 1);
    }

    #[tokio::test]
    async fn test_throttle_ceiling_is_permanent() {
        let store = MockStore::new();
        store.throttle_next(10).await;
        let coordinator = UploadCoordinator::new(Arc::new(store.clone()), &config(1024, 8));
        let artifact = TransferArtifact::in_memory(Bytes::from_static(b"x"), "text/plain");

        let err = coordinator.upload(&target("g/x"), &artifact).await.unwrap_err();
        assert!(matches!(err, UploadError::RateLimited { attempts: 3, .. }));
        assert_eq!(err.retryable(), Retryable::None);
        assert_eq!(store.put_calls().await, 3);
        assert!(store.objects().await.is_empty());
    }

    #[tokio::test]
    async fn test_other_error_is_bufferable_without_retry() {
        let store = MockStore::new();
        store.fail_next(1).await;
        let coordinator = UploadCoordinator::new(Arc::new(store.clone()), &config(1024, 8));
        let artifact = TransferArtifact::in_memory(Bytes::from_static(b"x"), "text/plain");

        let err = coordinator.upload(&target("g/x"), &artifact).await.unwrap_err();
        assert_eq!(err.retryable(), Retryable::BufferedRetry);
        assert_eq!(store.put_calls().await, 1);
    }

    #[tokio::test]
    async fn test_etag_mismatch_is_bufferable() {
        let store = MockStore::new();
        store.corrupt_etags(true).await;
        let coordinator = UploadCoordinator::new(Arc::new(store.clone()), &config(1024, 8));
        let artifact = TransferArtifact::in_memory(Bytes::from_static(b"hello"), "text/plain");

        let err = coordinator.upload(&target("g/a"), &artifact).await.unwrap_err();
        assert!(matches!(
            err,
            UploadError::Bufferable {
                source: StoreError::Integrity { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_multipart_from_file_with_progress() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        tokio::fs::write(&path, vec![7u8; 20]).await.unwrap();

        let store = MockStore::new();
        let (tx, mut rx) = mpsc::channel(16);
        let coordinator =
            UploadCoordinator::new(Arc::new(store.clone()), &config(10, 8)).with_progress(tx);
        let artifact = TransferArtifact::on_disk(path, 20, "application/octet-stream");

        let receipt = coordinator.upload(&target("g/big.bin"), &artifact).await.unwrap();
        assert!(receipt.multipart);

        let objects = store.objects().await;
        assert_eq!(objects[0].bytes.len(), 20);
        assert_eq!(objects[0].parts, 3);

        let mut seen = Vec::new();
        while let Ok(p) = rx.try_recv() {
            seen.push(p.bytes_sent);
        }
        assert_eq!(seen, vec![8, 16, 20]);
    }

    #[tokio::test]
    async fn test_multipart_failure_aborts() {
        let store = MockStore::new();
        store.fail_part(2).await;
        let coordinator = UploadCoordinator::new(Arc::new(store.clone()), &config(10, 8));
        let artifact =
            TransferArtifact::in_memory(Bytes::from(vec![1u8; 24]), "application/octet-stream");

        let err = coordinator.upload(&target("g/big.bin"), &artifact).await.unwrap_err();
        assert_eq!(err.retryable(), Retryable::BufferedRetry);
        assert!(store.objects().await.is_empty());
        assert_eq!(store.aborted().await, vec!["g/big.bin".to_string()]);
    }
}
