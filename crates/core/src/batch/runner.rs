//! Sequential batch driver.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use crate::config::StorageConfig;
use crate::manifest::{group_entries, Group, ManifestEntry};
use crate::metrics;
use crate::naming::{extension_of, storage_key};
use crate::resolver::{ResolvedTransfer, Resolver, ResourceRef};
use crate::transfer::{TransferArtifact, TransferEngine};
use crate::upload::{ObjectMetadata, Retryable, UploadCoordinator, UploadError, UploadReceipt, UploadTarget};

use super::report::{BatchSummary, ItemReport};
use super::scratch::ScratchDir;
use super::state::{IllegalTransition, ItemState, Stage};

/// Drives resolve, transfer, upload and cleanup for every item, one at a time.
pub struct BatchRunner {
    resolver: Arc<dyn Resolver>,
    engine: TransferEngine,
    uploader: UploadCoordinator,
    bucket: String,
    breadcrumb_prefix: bool,
    scratch_root: PathBuf,
}

/// Tracks one item's state and builds its report.
struct ItemRun<'a> {
    group: &'a str,
    index: usize,
    resource: &'a ResourceRef,
    state: ItemState,
    key: Option<String>,
    size_bytes: Option<u64>,
}

impl<'a> ItemRun<'a> {
    fn advance(&mut self, next: ItemState) -> Result<(), IllegalTransition> {
        self.state = self.state.advance(next)?;
        Ok(())
    }

    fn finish(self, stage: Option<Stage>, error: Option<String>) -> ItemReport {
        ItemReport {
            group: self.group.to_string(),
            index: self.index,
            title: self.resource.display_title.clone(),
            url: self.resource.entry_url.clone(),
            state: self.state,
            stage,
            key: self.key,
            size_bytes: self.size_bytes,
            error,
        }
    }

    /// Moves to `terminal` and logs the failure with full context.
    fn fail(mut self, terminal: ItemState, stage: Stage, message: String) -> ItemReport {
        if let Err(e) = self.advance(terminal) {
            warn!(error = %e, "Unexpected item transition");
        }
        warn!(
            group = self.group,
            title = %self.resource.display_title,
            url = %self.resource.entry_url,
            stage = stage.as_str(),
            error = %message,
            state = %self.state,
            "Item not uploaded"
        );
        self.finish(Some(stage), Some(message))
    }
}

impl BatchRunner {
    pub fn new(
        resolver: Arc<dyn Resolver>,
        engine: TransferEngine,
        uploader: UploadCoordinator,
        storage: &StorageConfig,
        scratch_root: PathBuf,
    ) -> Self {
        Self {
            resolver,
            engine,
            uploader,
            bucket: storage.bucket.clone().unwrap_or_default(),
            breadcrumb_prefix: storage.breadcrumb_prefix,
            scratch_root,
        }
    }

    /// Processes every entry in manifest order.
    ///
    /// Per-item failures are recorded in the summary and never stop the run.
    pub async fn run(&self, entries: Vec<ManifestEntry>) -> BatchSummary {
        let mut summary = BatchSummary::new();
        let groups = group_entries(entries);
        info!(
            run_id = %summary.run_id,
            groups = groups.len(),
            "Starting batch"
        );

        for group in &groups {
            self.run_group(group, &mut summary).await;
        }

        summary.finish();
        for item in &summary.items {
            info!(run_id = %summary.run_id, state = %item.state, "{}", item);
        }
        info!(
            run_id = %summary.run_id,
            total = summary.total(),
            uploaded = summary.uploaded(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            "Batch finished"
        );
        summary
    }

    async fn run_group(&self, group: &Group, summary: &mut BatchSummary) {
        if group.items.is_empty() {
            info!(group = %group.name, "Skipping empty group");
            return;
        }

        let scratch = match ScratchDir::create(&self.scratch_root, &group.name).await {
            Ok(dir) => dir,
            Err(e) => {
                warn!(group = %group.name, error = %e, "Cannot create scratch directory");
                for (i, resource) in group.items.iter().enumerate() {
                    let item = ItemRun {
                        group: &group.name,
                        index: i + 1,
                        resource,
                        state: ItemState::SessionReady,
                        key: None,
                        size_bytes: None,
                    };
                    let report = item.fail(
                        ItemState::Skipped,
                        Stage::Transfer,
                        format!("scratch directory unavailable: {}", e),
                    );
                    metrics::ITEMS.with_label_values(&[report.state.as_str()]).inc();
                    summary.record(report);
                }
                return;
            }
        };

        info!(group = %group.name, items = group.items.len(), "Processing group");
        for (i, resource) in group.items.iter().enumerate() {
            let index = i + 1;
            let span = info_span!("item", group = %group.name, index, url = %resource.entry_url);
            let report = self
                .process_item(&group.name, index, resource, scratch.path())
                .instrument(span)
                .await;
            metrics::ITEMS.with_label_values(&[report.state.as_str()]).inc();
            summary.record(report);
        }

        if let Some(warning) = scratch.remove().await {
            warn!(group = %group.name, %warning, "Scratch cleanup failed");
        }
    }

    async fn process_item(
        &self,
        group: &str,
        index: usize,
        resource: &ResourceRef,
        scratch_dir: &std::path::Path,
    ) -> ItemReport {
        let mut item = ItemRun {
            group,
            index,
            resource,
            state: ItemState::Idle,
            key: None,
            size_bytes: None,
        };

        // The session is owned by the run and already open.
        if let Err(e) = item.advance(ItemState::SessionReady) {
            return item.fail(ItemState::Skipped, Stage::Resolve, e.to_string());
        }

        let resolved = match self.resolver.resolve(resource).await {
            Ok(resolved) => resolved,
            Err(e) => {
                metrics::RESOLUTION_FAILURES
                    .with_label_values(&[e.reason()])
                    .inc();
                return item.fail(ItemState::Skipped, Stage::Resolve, e.to_string());
            }
        };
        if let Err(e) = item.advance(ItemState::Resolved) {
            return item.fail(ItemState::Skipped, Stage::Resolve, e.to_string());
        }

        let key = self.key_for(group, index, resource, &resolved);
        item.key = Some(key.clone());

        let artifact = match self.engine.transfer(resolved, scratch_dir).await {
            Ok(artifact) => artifact,
            Err(e) => return item.fail(ItemState::Failed, Stage::Transfer, e.to_string()),
        };
        item.size_bytes = Some(artifact.size_bytes);
        if let Err(e) = item.advance(ItemState::Transferred) {
            return item.fail(ItemState::Failed, Stage::Transfer, e.to_string());
        }

        let target = UploadTarget {
            bucket: self.bucket.clone(),
            key,
            metadata: ObjectMetadata::new(&resource.entry_url, title_for(resource)),
        };

        let (uploaded, artifact) = self.upload_with_buffered_retry(&target, artifact).await;

        // Scratch files go whether or not the upload worked.
        if let Some(warning) = artifact.cleanup().await {
            warn!(%warning, "Scratch cleanup failed");
        }

        match uploaded {
            Ok(_) => {
                if let Err(e) = item.advance(ItemState::Uploaded) {
                    return item.fail(ItemState::Failed, Stage::Upload, e.to_string());
                }
                if let Err(e) = item.advance(ItemState::CleanedUp) {
                    return item.fail(ItemState::Failed, Stage::Upload, e.to_string());
                }
                item.finish(None, None)
            }
            Err(e) => item.fail(ItemState::Failed, Stage::Upload, e.to_string()),
        }
    }

    /// Uploads, then retries once from memory if the failure allows it.
    ///
    /// Returns the artifact so the caller can clean it up.
    async fn upload_with_buffered_retry(
        &self,
        target: &UploadTarget,
        artifact: TransferArtifact,
    ) -> (Result<UploadReceipt, UploadError>, TransferArtifact) {
        let first = self.uploader.upload(target, &artifact).await;
        let err = match first {
            Ok(receipt) => return (Ok(receipt), artifact),
            Err(e) => e,
        };

        match err.retryable() {
            Retryable::BufferedRetry => {
                info!(key = %target.key, error = %err, "Retrying upload from memory buffer");
                let fallback = artifact.clone();
                match artifact.into_buffered().await {
                    Ok(buffered) => {
                        let second = self.uploader.upload(target, &buffered).await;
                        (second, buffered)
                    }
                    Err(read_err) => (
                        Err(UploadError::Source {
                            key: target.key.clone(),
                            source: std::io::Error::other(read_err.to_string()),
                        }),
                        fallback,
                    ),
                }
            }
            Retryable::Backoff | Retryable::None => (Err(err), artifact),
        }
    }

    /// `<group>[/<crumbs>]/<filename>`; crumbs only when enabled and no fixed name.
    fn key_for(
        &self,
        group: &str,
        index: usize,
        resource: &ResourceRef,
        resolved: &ResolvedTransfer,
    ) -> String {
        let filename = resource
            .fixed_filename
            .as_deref()
            .unwrap_or(&resolved.suggested_filename);

        let crumbs: &[String] = if self.breadcrumb_prefix && resource.fixed_filename.is_none() {
            &resolved.breadcrumbs
        } else {
            &[]
        };

        let extension = extension_of(filename)
            .or_else(|| resource.hinted_extension.clone())
            .or_else(|| extension_of(&resolved.transfer_url));
        storage_key(group, crumbs, filename, index, extension.as_deref())
    }
}

fn title_for(resource: &ResourceRef) -> String {
    if !resource.display_title.trim().is_empty() {
        resource.display_title.clone()
    } else if let Some(ref name) = resource.fixed_filename {
        name.clone()
    } else {
        resource.entry_url.clone()
    }
}
