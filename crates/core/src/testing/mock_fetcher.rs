//! Mock fetcher and remuxer for testing.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::transfer::{Fetched, Fetcher, Remuxer, TransferError};

/// A recorded fetch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
enum MockResponse {
    Body {
        bytes: Bytes,
        content_type: Option<String>,
    },
    Status(u16),
}

/// Mock implementation of the Fetcher trait.
///
/// Unscripted URLs answer 404 unless a default body is set.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    responses: Arc<RwLock<HashMap<String, MockResponse>>>,
    default_body: Arc<RwLock<Option<Bytes>>>,
    requests: Arc<RwLock<Vec<RecordedFetch>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn respond(&self, url: &str, bytes: Bytes, content_type: Option<String>) {
        self.responses
            .write()
            .await
            .insert(url.to_string(), MockResponse::Body { bytes, content_type });
    }

    pub async fn fail_with_status(&self, url: &str, status: u16) {
        self.responses
            .write()
            .await
            .insert(url.to_string(), MockResponse::Status(status));
    }

    /// Body returned for any URL without a scripted response.
    pub async fn respond_default(&self, bytes: Bytes) {
        *self.default_body.write().await = Some(bytes);
    }

    pub async fn requests(&self) -> Vec<RecordedFetch> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<Fetched, TransferError> {
        self.requests.write().await.push(RecordedFetch {
            url: url.to_string(),
            headers: headers.to_vec(),
        });

        let scripted = self.responses.read().await.get(url).cloned();
        match scripted {
            Some(MockResponse::Body {
                bytes,
                content_type,
            }) => Ok(Fetched {
                bytes,
                content_type,
            }),
            Some(MockResponse::Status(status)) => Err(TransferError::Http {
                status,
                url: url.to_string(),
            }),
            None => match self.default_body.read().await.clone() {
                Some(bytes) => Ok(Fetched {
                    bytes,
                    content_type: None,
                }),
                None => Err(TransferError::Http {
                    status: 404,
                    url: url.to_string(),
                }),
            },
        }
    }
}

/// A recorded remux for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRemux {
    pub playlist_url: String,
    pub headers: Vec<(String, String)>,
    pub output: PathBuf,
}

/// Mock implementation of the Remuxer trait. Writes a small file to `output`.
#[derive(Debug, Clone, Default)]
pub struct MockRemuxer {
    calls: Arc<RwLock<Vec<RecordedRemux>>>,
    next_error: Arc<RwLock<Option<String>>>,
}

impl MockRemuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next remux exit unsuccessfully with `message`.
    pub async fn fail_next(&self, message: &str) {
        *self.next_error.write().await = Some(message.to_string());
    }

    pub async fn calls(&self) -> Vec<RecordedRemux> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl Remuxer for MockRemuxer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn remux(
        &self,
        playlist_url: &str,
        headers: &[(String, String)],
        output: &Path,
    ) -> Result<PathBuf, TransferError> {
        self.calls.write().await.push(RecordedRemux {
            playlist_url: playlist_url.to_string(),
            headers: headers.to_vec(),
            output: output.to_path_buf(),
        });

        if let Some(message) = self.next_error.write().await.take() {
            return Err(TransferError::remux_failed(message, None));
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, b"remuxed").await?;
        Ok(output.to_path_buf())
    }
}
