//! Single-URL test mode: resolve and transfer to a local file, no upload.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::resolver::{ContentKind, ResolveError, Resolver, ResourceRef};
use crate::transfer::{ArtifactBody, TransferEngine, TransferError};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("Cannot write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What a probe produced.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub entry_url: String,
    pub transfer_url: String,
    pub content_kind: ContentKind,
    pub breadcrumbs: Vec<String>,
    pub output: PathBuf,
    pub size_bytes: u64,
}

/// Resolves `resource`, transfers it and writes the bytes to `output`.
///
/// Without `output` the suggested filename is used in the current directory.
pub async fn probe(
    resolver: &dyn Resolver,
    engine: &TransferEngine,
    resource: &ResourceRef,
    output: Option<&Path>,
    scratch_dir: &Path,
) -> Result<ProbeReport, ProbeError> {
    let resolved = resolver.resolve(resource).await?;
    info!(
        transfer_url = %resolved.transfer_url,
        filename = %resolved.suggested_filename,
        "Resolved"
    );

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&resolved.suggested_filename));
    let transfer_url = resolved.transfer_url.clone();
    let content_kind = resolved.content_kind;
    let breadcrumbs = resolved.breadcrumbs.clone();

    let artifact = engine.transfer(resolved, scratch_dir).await?;
    let out_err = |source| ProbeError::Output {
        path: output.clone(),
        source,
    };

    match &artifact.body {
        ArtifactBody::Memory(bytes) => tokio::fs::write(&output, bytes).await.map_err(out_err)?,
        ArtifactBody::File(path) => {
            // Scratch may sit on another filesystem, so copy rather than rename.
            tokio::fs::copy(path, &output).await.map_err(out_err)?;
            if let Some(warning) = artifact.cleanup().await {
                tracing::warn!(%warning, "Scratch cleanup failed");
            }
        }
    }

    info!(output = %output.display(), size_bytes = artifact.size_bytes, "Probe complete");
    Ok(ProbeReport {
        entry_url: resource.entry_url.clone(),
        transfer_url,
        content_kind,
        breadcrumbs,
        output,
        size_bytes: artifact.size_bytes,
    })
}
