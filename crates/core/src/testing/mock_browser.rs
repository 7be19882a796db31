//! Mock browser for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex, RwLock};

use crate::session::{
    Anchor, BrowserBackend, CapturedResponse, Cookie, PageHandle, ResponseWatch, SessionError,
};

/// What a URL looks like to the mock browser.
#[derive(Debug, Clone, Default)]
pub struct MockPageSpec {
    pub anchors: Vec<Anchor>,
    pub breadcrumbs: Vec<String>,
    /// Responses observed while the page loads.
    pub responses: Vec<CapturedResponse>,
    /// If set, navigating here fails with this reason.
    pub navigation_error: Option<String>,
}

impl MockPageSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_anchor(mut self, href: &str, text: &str) -> Self {
        self.anchors.push(Anchor {
            href: href.to_string(),
            text: text.to_string(),
        });
        self
    }

    pub fn with_breadcrumbs(mut self, crumbs: &[&str]) -> Self {
        self.breadcrumbs = crumbs.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_response(mut self, url: &str, status: u16, body: &str) -> Self {
        self.responses.push(CapturedResponse {
            url: url.to_string(),
            status,
            body: body.to_string(),
        });
        self
    }

    pub fn failing_navigation(mut self, reason: &str) -> Self {
        self.navigation_error = Some(reason.to_string());
        self
    }
}

#[derive(Debug, Default)]
struct BrowserState {
    pages: HashMap<String, MockPageSpec>,
    cookies: Vec<Cookie>,
    opened: usize,
    closed: usize,
    visited: Vec<String>,
    fail_next_open: bool,
}

/// Mock implementation of the BrowserBackend trait.
///
/// Provides controllable behavior for testing:
/// - Serve scripted pages (anchors, breadcrumbs, network responses)
/// - Simulate navigation failures
/// - Count opened and closed pages
///
/// # Example
///
/// ```rust,ignore
/// let browser = MockBrowser::new();
/// browser
///     .add_page(
///         "https://moodle.example.edu/mod/page/view.php?id=1",
///         MockPageSpec::new().with_anchor(VIEWER_URL, "Lecture 1"),
///     )
///     .await;
///
/// let broker = SessionBroker::with_backend(Arc::new(browser.clone()), &config);
/// // ... resolve ...
/// assert_eq!(browser.pages_opened().await, browser.pages_closed().await);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockBrowser {
    state: Arc<RwLock<BrowserState>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts what navigating to `url` shows.
    pub async fn add_page(&self, url: &str, spec: MockPageSpec) {
        self.state.write().await.pages.insert(url.to_string(), spec);
    }

    pub async fn set_cookies(&self, cookies: Vec<Cookie>) {
        self.state.write().await.cookies = cookies;
    }

    /// Makes the next `open_page` call fail.
    pub async fn fail_next_open(&self) {
        self.state.write().await.fail_next_open = true;
    }

    pub async fn pages_opened(&self) -> usize {
        self.state.read().await.opened
    }

    pub async fn pages_closed(&self) -> usize {
        self.state.read().await.closed
    }

    /// Every URL navigated to, in order.
    pub async fn visited(&self) -> Vec<String> {
        self.state.read().await.visited.clone()
    }
}

#[async_trait]
impl BrowserBackend for MockBrowser {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open_page(&self) -> Result<Arc<dyn PageHandle>, SessionError> {
        let mut state = self.state.write().await;
        if state.fail_next_open {
            state.fail_next_open = false;
            return Err(SessionError::PageOpen("mock open failure".to_string()));
        }
        state.opened += 1;
        Ok(Arc::new(MockPage {
            browser: Arc::clone(&self.state),
            current: RwLock::new(None),
            watches: Mutex::new(Vec::new()),
        }))
    }
}

struct MockPage {
    browser: Arc<RwLock<BrowserState>>,
    current: RwLock<Option<MockPageSpec>>,
    watches: Mutex<Vec<(String, oneshot::Sender<CapturedResponse>)>>,
}

#[async_trait]
impl PageHandle for MockPage {
    async fn goto(&self, url: &str) -> Result<(), SessionError> {
        let spec = {
            let mut state = self.browser.write().await;
            state.visited.push(url.to_string());
            state.pages.get(url).cloned().unwrap_or_default()
        };

        if let Some(ref reason) = spec.navigation_error {
            return Err(SessionError::Navigation {
                url: url.to_string(),
                reason: reason.clone(),
            });
        }

        // Deliver responses to watches armed before this navigation.
        let mut watches = self.watches.lock().await;
        for response in &spec.responses {
            if let Some(pos) = watches
                .iter()
                .position(|(fragment, _)| response.url.contains(fragment.as_str()))
            {
                let (_, tx) = watches.remove(pos);
                let _ = tx.send(response.clone());
            }
        }
        drop(watches);

        *self.current.write().await = Some(spec);
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, SessionError> {
        Ok(self.browser.read().await.cookies.clone())
    }

    async fn anchors(&self) -> Result<Vec<Anchor>, SessionError> {
        Ok(self
            .current
            .read()
            .await
            .as_ref()
            .map(|s| s.anchors.clone())
            .unwrap_or_default())
    }

    async fn breadcrumbs(&self, _selector: &str) -> Result<Vec<String>, SessionError> {
        Ok(self
            .current
            .read()
            .await
            .as_ref()
            .map(|s| s.breadcrumbs.clone())
            .unwrap_or_default())
    }

    async fn watch_responses(&self, url_fragment: &str) -> Result<ResponseWatch, SessionError> {
        let (tx, watch) = ResponseWatch::channel(url_fragment);
        self.watches
            .lock()
            .await
            .push((url_fragment.to_string(), tx));
        Ok(watch)
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.browser.write().await.closed += 1;
        Ok(())
    }
}
