//! Resolver integration tests against the mock browser.

use std::sync::Arc;

use lectern_core::{
    config::{ResolverConfig, SessionConfig},
    resolver::{BrowserResolver, ContentKind, ResolveError, Resolver, StrategyKind},
    session::{Cookie, SessionBroker},
    testing::{
        fixtures::{self, DELIVERY_URL, LANDING_URL, MEDIA_URL, VIEWER_URL},
        MockBrowser, MockPageSpec,
    },
};

const PLAYLIST_URL: &str = "https://cdn.example.edu/sessions/lecture-1/master.m3u8";

fn resolver(browser: &MockBrowser, config: ResolverConfig) -> BrowserResolver {
    let broker = Arc::new(SessionBroker::with_backend(
        Arc::new(browser.clone()),
        &SessionConfig::default(),
    ));
    BrowserResolver::new(broker, &config).unwrap()
}

async fn browser_with_viewer(delivery_status: u16, delivery_body: &str) -> MockBrowser {
    let browser = MockBrowser::new();
    browser
        .set_cookies(vec![Cookie::new(".ASPXAUTH", "tok", "panopto.example.edu")])
        .await;
    browser
        .add_page(
            LANDING_URL,
            MockPageSpec::new()
                .with_anchor(VIEWER_URL, "Lecture")
                .with_breadcrumbs(&["Biology", "Week 2"]),
        )
        .await;
    browser
        .add_page(
            VIEWER_URL,
            MockPageSpec::new().with_response(DELIVERY_URL, delivery_status, delivery_body),
        )
        .await;
    browser
}

#[tokio::test]
async fn test_indirect_resolution_uses_session_name() {
    let browser = browser_with_viewer(200, &fixtures::delivery_json("Cell: Division?", MEDIA_URL)).await;
    let resolver = resolver(&browser, fixtures::resolver_config());

    let resolved = resolver
        .resolve(&fixtures::resource(LANDING_URL, "Lecture 2"))
        .await
        .unwrap();

    assert_eq!(resolved.transfer_url, MEDIA_URL);
    assert_eq!(resolved.content_kind, ContentKind::Media);
    assert_eq!(resolved.suggested_filename, "Cell Division.mp4");
    assert_eq!(resolved.breadcrumbs, vec!["Biology", "Week 2"]);
    assert_eq!(resolved.header("Cookie"), Some(".ASPXAUTH=tok"));
    assert_eq!(browser.visited().await, vec![LANDING_URL, VIEWER_URL]);
    assert_eq!(browser.pages_opened().await, browser.pages_closed().await);
}

#[tokio::test]
async fn test_playlist_only_needs_hls_fallback() {
    let body = fixtures::playlist_delivery_json("Lecture", PLAYLIST_URL);

    let browser = browser_with_viewer(200, &body).await;
    let err = resolver(&browser, fixtures::resolver_config())
        .resolve(&fixtures::resource(LANDING_URL, ""))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::MissingStream));

    let config = ResolverConfig {
        allow_hls_fallback: true,
        ..fixtures::resolver_config()
    };
    let browser = browser_with_viewer(200, &body).await;
    let resolved = resolver(&browser, config)
        .resolve(&fixtures::resource(LANDING_URL, ""))
        .await
        .unwrap();
    assert_eq!(resolved.content_kind, ContentKind::Playlist);
    assert_eq!(resolved.transfer_url, PLAYLIST_URL);
}

#[tokio::test]
async fn test_manifest_error_status_is_malformed() {
    let browser = browser_with_viewer(500, "Server Error").await;
    let err = resolver(&browser, fixtures::resolver_config())
        .resolve(&fixtures::resource(LANDING_URL, ""))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::MalformedManifest(_)));
}

#[tokio::test]
async fn test_missing_manifest_times_out() {
    let browser = MockBrowser::new();
    browser
        .add_page(LANDING_URL, MockPageSpec::new().with_anchor(VIEWER_URL, "Lecture"))
        .await;
    // The viewer loads but never requests a delivery manifest.
    browser.add_page(VIEWER_URL, MockPageSpec::new()).await;

    let err = resolver(&browser, fixtures::resolver_config())
        .resolve(&fixtures::resource(LANDING_URL, ""))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::ManifestTimeout { timeout_secs: 1 }));
    assert_eq!(err.reason(), "manifest_timeout");
    assert_eq!(browser.pages_opened().await, browser.pages_closed().await);
}

#[tokio::test]
async fn test_direct_download_tolerates_aborted_navigation() {
    let url = "https://moodle.example.edu/pluginfile.php/12/slides.pptx";
    let browser = MockBrowser::new();
    browser
        .set_cookies(vec![Cookie::new("MoodleSession", "abc", "moodle.example.edu")])
        .await;
    // Browsers abort navigation when the response is a download.
    browser
        .add_page(url, MockPageSpec::new().failing_navigation("net::ERR_ABORTED"))
        .await;

    let resolver = resolver(&browser, fixtures::resolver_config());
    assert_eq!(resolver.strategy_for(url), StrategyKind::Direct);

    let resolved = resolver
        .resolve(&fixtures::resource(url, "Resource 3"))
        .await
        .unwrap();
    assert_eq!(resolved.transfer_url, format!("{}?forcedownload=1", url));
    assert_eq!(resolved.suggested_filename, "slides.pptx");
    assert_eq!(resolved.content_kind, ContentKind::Document);
    assert_eq!(resolved.header("Cookie"), Some("MoodleSession=abc"));
}

#[tokio::test]
async fn test_page_open_failure_is_session_error() {
    let browser = MockBrowser::new();
    browser.fail_next_open().await;

    let err = resolver(&browser, fixtures::resolver_config())
        .resolve(&fixtures::resource("https://moodle.example.edu/a.pdf", "A"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Session(_)));
    assert_eq!(browser.pages_opened().await, 0);
}
