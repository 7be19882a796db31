//! S3 store tests against a local server that always throttles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use lectern_core::config::StorageConfig;
use lectern_core::testing::fixtures;
use lectern_core::transfer::{ArtifactBody, TransferArtifact};
use lectern_core::upload::{
    ObjectMetadata, ObjectStore, S3Store, StoreError, UploadCoordinator, UploadError, UploadTarget,
};

const SLOW_DOWN: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<Error><Code>SlowDown</Code><Message>Please reduce your request rate.</Message>\
<RequestId>req-1</RequestId></Error>";

/// Answers every request with `503 SlowDown` and counts them.
async fn throttling_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&requests);
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                let _ = read_request(socket, &counter).await;
            });
        }
    });

    (format!("http://{}", addr), requests)
}

/// Reads one request with its body, counts it and answers `503`.
async fn read_request(mut socket: TcpStream, counter: &AtomicUsize) -> std::io::Result<()> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        data.extend_from_slice(&buf[..n]);
    };

    let head = String::from_utf8_lossy(&data[..head_end]).to_ascii_lowercase();
    if head.contains("expect: 100-continue") {
        socket.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await?;
    }
    let content_length = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok());

    match content_length {
        Some(len) => {
            while data.len() < head_end + len {
                let n = socket.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                data.extend_from_slice(&buf[..n]);
            }
        }
        None if head.contains("transfer-encoding: chunked") => {
            while !(data[head_end..].windows(3).any(|w| w == b"0\r\n")
                && data.ends_with(b"\r\n\r\n"))
            {
                let n = socket.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                data.extend_from_slice(&buf[..n]);
            }
        }
        None => {}
    }

    counter.fetch_add(1, Ordering::SeqCst);
    let response = format!(
        "HTTP/1.1 503 Slow Down\r\nContent-Type: application/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        SLOW_DOWN.len(),
        SLOW_DOWN
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

fn local_storage(endpoint: &str) -> StorageConfig {
    StorageConfig {
        endpoint: Some(endpoint.to_string()),
        region: Some("us-east-1".to_string()),
        access_key_id: Some("test-key".to_string()),
        secret_access_key: Some("test-secret".to_string()),
        ..fixtures::storage_config()
    }
}

fn target() -> UploadTarget {
    UploadTarget {
        bucket: "lectures".to_string(),
        key: "Math/Math 1.mp4".to_string(),
        metadata: ObjectMetadata::new("https://cdn.example.edu/a.mp4", "Math 1"),
    }
}

#[tokio::test]
async fn test_put_object_sends_exactly_one_request() {
    let (endpoint, requests) = throttling_server().await;
    let store = S3Store::from_config(&local_storage(&endpoint)).await;

    let body = ArtifactBody::Memory(Bytes::from_static(b"lecture bytes"));
    let result = tokio::time::timeout(
        Duration::from_secs(30),
        store.put_object(&target(), &body, "video/mp4"),
    )
    .await
    .expect("put_object hung");

    let err = result.unwrap_err();
    assert!(
        matches!(err, StoreError::Throttled { operation: "PutObject", .. }),
        "got {:?}",
        err
    );
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_throttled_upload_stops_at_attempt_ceiling() {
    let (endpoint, requests) = throttling_server().await;
    let storage = local_storage(&endpoint);
    let store = S3Store::from_config(&storage).await;
    let uploader = UploadCoordinator::new(Arc::new(store), &storage);

    let artifact = TransferArtifact::in_memory(Bytes::from_static(b"lecture bytes"), "video/mp4");
    let result = tokio::time::timeout(Duration::from_secs(30), uploader.upload(&target(), &artifact))
        .await
        .expect("upload hung");

    assert!(matches!(
        result,
        Err(UploadError::RateLimited { attempts: 3, .. })
    ));
    assert_eq!(requests.load(Ordering::SeqCst), 3);
}
