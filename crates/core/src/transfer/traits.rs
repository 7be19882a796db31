//! Trait definitions for the transfer module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::error::TransferError;
use super::types::Fetched;

/// Buffered HTTP retrieval.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Sends one GET with `headers` and returns the whole body.
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<Fetched, TransferError>;
}

/// Playlist-to-file remuxing through an external process.
#[async_trait]
pub trait Remuxer: Send + Sync {
    fn name(&self) -> &str;

    /// Copies the streams behind `playlist_url` into `output`.
    async fn remux(
        &self,
        playlist_url: &str,
        headers: &[(String, String)],
        output: &Path,
    ) -> Result<PathBuf, TransferError>;
}
