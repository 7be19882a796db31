//! reqwest-backed fetcher.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::TransferConfig;

use super::error::TransferError;
use super::traits::Fetcher;
use super::types::Fetched;

pub struct HttpFetcher {
    client: Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(config: &TransferConfig) -> Result<Self, TransferError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.request_timeout_secs));
        if let Some(ref agent) = config.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder
            .build()
            .map_err(|e| TransferError::Request(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: config.request_timeout_secs,
        })
    }

    fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, TransferError> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransferError::Request(format!("invalid header {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransferError::Request(format!("invalid header value: {}", e)))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<Fetched, TransferError> {
        let response = self
            .client
            .get(url)
            .headers(Self::header_map(headers)?)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransferError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    TransferError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await?;
        debug!(url, bytes = bytes.len(), "Fetched body");

        Ok(Fetched {
            bytes,
            content_type,
        })
    }
}
