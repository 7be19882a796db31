//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every external seam (the
//! browser, HTTP fetching, remuxing and the object store), so whole batches
//! can run in tests without a browser, network or bucket.
//!
//! # Example
//!
//! ```rust,ignore
//! use lectern_core::testing::{MockBrowser, MockFetcher, MockRemuxer, MockStore};
//!
//! let browser = MockBrowser::new();
//! let fetcher = MockFetcher::new();
//! let store = MockStore::new();
//!
//! // Script pages and responses
//! browser.add_page(LANDING, MockPageSpec::new().with_anchor(VIEWER, "Lecture")).await;
//! fetcher.respond(MEDIA, Bytes::from_static(b"mp4"), None).await;
//! store.throttle_next(1).await;
//! ```

mod mock_browser;
mod mock_fetcher;
mod mock_store;

pub use mock_browser::{MockBrowser, MockPageSpec};
pub use mock_fetcher::{MockFetcher, MockRemuxer, RecordedFetch, RecordedRemux};
pub use mock_store::{MockStore, StoredObject};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::config::{ResolverConfig, RetryConfig, StorageConfig};
    use crate::resolver::ResourceRef;

    /// A landing page on the learning platform.
    pub const LANDING_URL: &str = "https://moodle.example.edu/mod/page/view.php?id=42";

    /// A lecture viewer page.
    pub const VIEWER_URL: &str =
        "https://panopto.example.edu/Panopto/Pages/Viewer.aspx?id=0b7c1d2e-3f40-4a5b-8c6d-7e8f9a0b1c2d";

    /// Where the viewer's delivery manifest is fetched from.
    pub const DELIVERY_URL: &str =
        "https://panopto.example.edu/Panopto/Pages/Viewer/DeliveryInfo.aspx";

    /// Media URL served by [`delivery_json`].
    pub const MEDIA_URL: &str = "https://cdn.example.edu/sessions/lecture-1/podcast.mp4";

    /// Create a resource with a title.
    pub fn resource(url: &str, title: &str) -> ResourceRef {
        ResourceRef::new(url, title)
    }

    /// A delivery manifest with one podcast stream.
    pub fn delivery_json(session_name: &str, stream_url: &str) -> String {
        serde_json::json!({
            "Delivery": {
                "SessionName": session_name,
                "PodcastStreams": [{ "StreamUrl": stream_url }],
                "Streams": []
            }
        })
        .to_string()
    }

    /// A delivery manifest with only an adaptive playlist.
    pub fn playlist_delivery_json(session_name: &str, playlist_url: &str) -> String {
        serde_json::json!({
            "Delivery": {
                "SessionName": session_name,
                "PodcastStreams": [],
                "Streams": [{ "StreamUrl": playlist_url }]
            }
        })
        .to_string()
    }

    /// Resolver settings matching the URLs above, with short timeouts.
    pub fn resolver_config() -> ResolverConfig {
        ResolverConfig {
            manifest_timeout_secs: 1,
            ..Default::default()
        }
    }

    /// Storage settings with fast retries.
    pub fn storage_config() -> StorageConfig {
        StorageConfig {
            bucket: Some("lectures".to_string()),
            region: Some("eu-west-1".to_string()),
            retry: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 1,
                jitter_ms: 0,
            },
            ..Default::default()
        }
    }
}
