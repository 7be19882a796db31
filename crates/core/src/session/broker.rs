//! Page lifecycle management over a browser backend.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;

use super::chromium::ChromiumBackend;
use super::error::SessionError;
use super::traits::{BrowserBackend, PageHandle};
use super::types::cookie_header;

/// Owns the browser for the duration of a run.
pub struct SessionBroker {
    backend: Arc<dyn BrowserBackend>,
    navigation_timeout: Duration,
    page_timeout: Duration,
}

impl SessionBroker {
    /// Attaches to the configured endpoint, or launches against the profile.
    ///
    /// Failure here is fatal for the run.
    pub async fn acquire(config: &SessionConfig) -> Result<Self, SessionError> {
        let backend = ChromiumBackend::connect_or_launch(config).await?;
        info!(backend = backend.name(), "Browser session acquired");
        Ok(Self::with_backend(Arc::new(backend), config))
    }

    /// Wraps an existing backend.
    pub fn with_backend(backend: Arc<dyn BrowserBackend>, config: &SessionConfig) -> Self {
        Self {
            backend,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            page_timeout: Duration::from_secs(config.page_timeout_secs),
        }
    }

    /// Opens a page, runs `action` with it, and closes the page afterwards.
    ///
    /// The page is closed whether the action succeeds, fails, or runs past the
    /// page lifetime bound. Close failures are logged, not returned.
    pub async fn with_page<T, E, F, Fut>(&self, action: F) -> Result<T, E>
    where
        F: FnOnce(Arc<dyn PageHandle>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<SessionError>,
    {
        let page = self.backend.open_page().await?;
        let outcome = tokio::time::timeout(self.page_timeout, action(Arc::clone(&page))).await;

        if let Err(e) = page.close().await {
            warn!(error = %e, "Failed to close page");
        } else {
            debug!("Page closed");
        }

        match outcome {
            Ok(result) => result,
            Err(_) => Err(SessionError::PageTimeout {
                timeout_secs: self.page_timeout.as_secs(),
            }
            .into()),
        }
    }

    /// Navigates `page` to `url` within the navigation timeout.
    pub async fn navigate(&self, page: &dyn PageHandle, url: &str) -> Result<(), SessionError> {
        match tokio::time::timeout(self.navigation_timeout, page.goto(url)).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::NavigationTimeout {
                url: url.to_string(),
                timeout_secs: self.navigation_timeout.as_secs(),
            }),
        }
    }

    /// Serializes the page's cookie jar into a `Cookie` header value.
    pub async fn cookie_header(&self, page: &dyn PageHandle) -> Result<Option<String>, SessionError> {
        let cookies = page.cookies().await?;
        debug!(count = cookies.len(), "Captured cookies");
        Ok(cookie_header(&cookies))
    }

    /// Releases the browser.
    pub async fn shutdown(&self) {
        if let Err(e) = self.backend.shutdown().await {
            warn!(error = %e, "Browser shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Cookie;
    use crate::testing::MockBrowser;

    fn broker(browser: &MockBrowser) -> SessionBroker {
        let config = SessionConfig {
            navigation_timeout_secs: 1,
            page_timeout_secs: 1,
            ..Default::default()
        };
        SessionBroker::with_backend(Arc::new(browser.clone()), &config)
    }

    #[tokio::test]
    async fn test_with_page_closes_on_success() {
        let browser = MockBrowser::new();
        let broker = broker(&browser);

        let value: Result<u32, SessionError> = broker.with_page(|_page| async { Ok(7) }).await;
        assert_eq!(value.unwrap(), 7);
        assert_eq!(browser.pages_opened().await, 1);
        assert_eq!(browser.pages_closed().await, 1);
    }

    #[tokio::test]
    async fn test_with_page_closes_on_error() {
        let browser = MockBrowser::new();
        let broker = broker(&browser);

        let result: Result<(), SessionError> = broker
            .with_page(|_page| async { Err(SessionError::Script("boom".to_string())) })
            .await;
        assert!(matches!(result, Err(SessionError::Script(_))));
        assert_eq!(browser.pages_closed().await, 1);
    }

    #[tokio::test]
    async fn test_with_page_closes_on_timeout() {
        let browser = MockBrowser::new();
        let broker = broker(&browser);

        let result: Result<(), SessionError> = broker
            .with_page(|_page| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(SessionError::PageTimeout { .. })));
        assert_eq!(browser.pages_closed().await, 1);
    }

    #[tokio::test]
    async fn test_cookie_header_from_page() {
        let browser = MockBrowser::new();
        browser.set_cookies(vec![
            Cookie::new("a", "1", "example.edu"),
            Cookie::new("b", "2", "example.edu"),
        ])
        .await;
        let broker = broker(&browser);

        let header: Result<Option<String>, SessionError> = broker
            .with_page(|page| {
                let broker = &broker;
                async move { broker.cookie_header(page.as_ref()).await }
            })
            .await;
        assert_eq!(header.unwrap().as_deref(), Some("a=1; b=2"));
    }
}
