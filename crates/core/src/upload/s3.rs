//! S3 object store.

use async_trait::async_trait;
use aws_config::retry::RetryConfig as SdkRetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::transfer::ArtifactBody;

use super::error::{is_throttle, StoreError};
use super::traits::ObjectStore;
use super::types::{PartReceipt, UploadTarget};

pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Builds a client from the storage section.
    ///
    /// Static credentials are used when both keys are set; otherwise the
    /// default provider chain applies. SDK retries are off: every call is one
    /// request and the coordinator owns the retry policy.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).retry_config(SdkRetryConfig::disabled());
        if let Some(ref region) = config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let (Some(ak), Some(sk)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                ak.clone(),
                sk.clone(),
                None,
                None,
                "lectern",
            ));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(ref endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        info!(
            region = config.region.as_deref().unwrap_or("default"),
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            "S3 client ready"
        );
        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

fn classify<E>(operation: &'static str, err: SdkError<E, HttpResponse>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = err.code().map(|c| c.to_string());
    let status = err.raw_response().map(|r| r.status().as_u16());
    let message = DisplayErrorContext(&err).to_string();

    if is_throttle(code.as_deref(), status) {
        StoreError::Throttled {
            operation,
            code: code.unwrap_or_else(|| status.map(|s| s.to_string()).unwrap_or_default()),
            message,
        }
    } else {
        StoreError::Service {
            operation,
            status,
            code,
            message,
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &str {
        "s3"
    }

    async fn put_object(
        &self,
        target: &UploadTarget,
        body: &ArtifactBody,
        content_type: &str,
    ) -> Result<Option<String>, StoreError> {
        let stream = match body {
            ArtifactBody::Memory(bytes) => ByteStream::from(bytes.clone()),
            ArtifactBody::File(path) => ByteStream::from_path(path)
                .await
                .map_err(|e| StoreError::Body(e.to_string()))?,
        };

        let mut request = self
            .client
            .put_object()
            .bucket(&target.bucket)
            .key(&target.key)
            .content_type(content_type)
            .body(stream);
        for (k, v) in target.metadata.to_pairs() {
            request = request.metadata(k, v);
        }

        let output = request
            .send()
            .await
            .map_err(|e| classify("PutObject", e))?;
        debug!(key = %target.key, "PutObject ok");
        Ok(output.e_tag().map(|s| s.to_string()))
    }

    async fn create_multipart(
        &self,
        target: &UploadTarget,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let mut request = self
            .client
            .create_multipart_upload()
            .bucket(&target.bucket)
            .key(&target.key)
            .content_type(content_type);
        for (k, v) in target.metadata.to_pairs() {
            request = request.metadata(k, v);
        }

        let output = request
            .send()
            .await
            .map_err(|e| classify("CreateMultipartUpload", e))?;
        output
            .upload_id()
            .map(|s| s.to_string())
            .ok_or_else(|| StoreError::Service {
                operation: "CreateMultipartUpload",
                status: None,
                code: None,
                message: "response carried no upload id".to_string(),
            })
    }

    async fn upload_part(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        part_number: i32,
        bytes: Bytes,
    ) -> Result<PartReceipt, StoreError> {
        let output = self
            .client
            .upload_part()
            .bucket(&target.bucket)
            .key(&target.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| classify("UploadPart", e))?;

        Ok(PartReceipt {
            part_number,
            etag: output.e_tag().map(|s| s.to_string()),
        })
    }

    async fn complete_multipart(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        parts: &[PartReceipt],
    ) -> Result<Option<String>, StoreError> {
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(
                parts
                    .iter()
                    .map(|p| {
                        CompletedPart::builder()
                            .part_number(p.part_number)
                            .set_e_tag(p.etag.clone())
                            .build()
                    })
                    .collect(),
            ))
            .build();

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(&target.bucket)
            .key(&target.key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| classify("CompleteMultipartUpload", e))?;
        Ok(output.e_tag().map(|s| s.to_string()))
    }

    async fn abort_multipart(&self, target: &UploadTarget, upload_id: &str) -> Result<(), StoreError> {
        self.client
            .abort_multipart_upload()
            .bucket(&target.bucket)
            .key(&target.key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| classify("AbortMultipartUpload", e))?;
        Ok(())
    }
}
