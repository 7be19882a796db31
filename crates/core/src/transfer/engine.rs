//! Dispatch between buffered fetch and remux.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::metrics;
use crate::naming::sanitize_filename;
use crate::resolver::{ContentKind, ResolvedTransfer};

use super::error::TransferError;
use super::traits::{Fetcher, Remuxer};
use super::types::{content_type_for, TransferArtifact};

pub struct TransferEngine {
    fetcher: Arc<dyn Fetcher>,
    remuxer: Arc<dyn Remuxer>,
    spool_to_disk: bool,
}

impl TransferEngine {
    pub fn new(fetcher: Arc<dyn Fetcher>, remuxer: Arc<dyn Remuxer>, spool_to_disk: bool) -> Self {
        Self {
            fetcher,
            remuxer,
            spool_to_disk,
        }
    }

    /// Retrieves the bytes behind `resolved`.
    ///
    /// Playlists are remuxed into `scratch_dir`. Everything else is fetched
    /// into memory and, when spooling is on, written to exactly one scratch
    /// file before the buffer is dropped.
    pub async fn transfer(
        &self,
        resolved: ResolvedTransfer,
        scratch_dir: &Path,
    ) -> Result<TransferArtifact, TransferError> {
        let start = Instant::now();
        let filename = sanitize_filename(&resolved.suggested_filename, "download.bin");
        let scratch_path = scratch_dir.join(&filename);

        let artifact = match resolved.content_kind {
            ContentKind::Playlist => {
                let output = self
                    .remuxer
                    .remux(&resolved.transfer_url, &resolved.auth_headers, &scratch_path)
                    .await?;
                let size = tokio::fs::metadata(&output).await?.len();
                TransferArtifact::on_disk(output, size, content_type_for(&filename))
            }
            ContentKind::Media | ContentKind::Document | ContentKind::Unknown => {
                let fetched = self
                    .fetcher
                    .fetch(&resolved.transfer_url, &resolved.auth_headers)
                    .await?;
                let content_type = fetched
                    .content_type
                    .filter(|ct| !ct.is_empty())
                    .unwrap_or_else(|| content_type_for(&filename).to_string());

                if self.spool_to_disk {
                    tokio::fs::create_dir_all(scratch_dir).await?;
                    tokio::fs::write(&scratch_path, &fetched.bytes).await?;
                    let size = fetched.bytes.len() as u64;
                    debug!(path = %scratch_path.display(), size, "Spooled to scratch");
                    TransferArtifact::on_disk(scratch_path, size, content_type)
                } else {
                    TransferArtifact::in_memory(fetched.bytes, content_type)
                }
            }
        };

        let elapsed = start.elapsed();
        metrics::TRANSFER_DURATION
            .with_label_values(&[kind_label(resolved.content_kind)])
            .observe(elapsed.as_secs_f64());
        info!(
            filename = %filename,
            size_bytes = artifact.size_bytes,
            elapsed_ms = elapsed.as_millis() as u64,
            "Transfer complete"
        );
        Ok(artifact)
    }

    pub fn remuxer_name(&self) -> &str {
        self.remuxer.name()
    }
}

fn kind_label(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Media => "media",
        ContentKind::Playlist => "playlist",
        ContentKind::Document => "document",
        ContentKind::Unknown => "unknown",
    }
}
