//! Types for the transfer module.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::naming::extension_of;

use super::error::{CleanupWarning, TransferError};

/// Where an artifact's bytes live.
#[derive(Debug, Clone)]
pub enum ArtifactBody {
    Memory(Bytes),
    /// A file inside the group's scratch directory.
    File(PathBuf),
}

/// Bytes retrieved for one item, ready for upload.
#[derive(Debug, Clone)]
pub struct TransferArtifact {
    pub body: ArtifactBody,
    pub size_bytes: u64,
    pub content_type: String,
}

impl TransferArtifact {
    pub fn in_memory(bytes: Bytes, content_type: impl Into<String>) -> Self {
        Self {
            size_bytes: bytes.len() as u64,
            body: ArtifactBody::Memory(bytes),
            content_type: content_type.into(),
        }
    }

    pub fn on_disk(path: PathBuf, size_bytes: u64, content_type: impl Into<String>) -> Self {
        Self {
            body: ArtifactBody::File(path),
            size_bytes,
            content_type: content_type.into(),
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self.body, ArtifactBody::Memory(_))
    }

    pub fn scratch_path(&self) -> Option<&Path> {
        match &self.body {
            ArtifactBody::File(path) => Some(path),
            ArtifactBody::Memory(_) => None,
        }
    }

    /// Loads a file-backed artifact into memory and removes the file.
    pub async fn into_buffered(self) -> Result<Self, TransferError> {
        match self.body {
            ArtifactBody::Memory(_) => Ok(self),
            ArtifactBody::File(ref path) => {
                let bytes = Bytes::from(tokio::fs::read(path).await?);
                if let Some(warning) = remove_scratch(path).await {
                    warn!(%warning, "Scratch cleanup failed");
                }
                Ok(Self::in_memory(bytes, self.content_type))
            }
        }
    }

    /// Removes the scratch file, if any.
    pub async fn cleanup(&self) -> Option<CleanupWarning> {
        match &self.body {
            ArtifactBody::File(path) => remove_scratch(path).await,
            ArtifactBody::Memory(_) => None,
        }
    }
}

async fn remove_scratch(path: &Path) -> Option<CleanupWarning> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => None,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => Some(CleanupWarning {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// A fetched response body.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Content type for a filename, by extension.
pub fn content_type_for(filename: &str) -> &'static str {
    match extension_of(filename).as_deref() {
        Some("mp4" | "m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("pdf") => "application/pdf",
        Some("ppt" | "pps") => "application/vnd.ms-powerpoint",
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        Some("ppsm") => "application/vnd.ms-powerpoint.slideshow.macroEnabled.12",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("zip") => "application/zip",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
