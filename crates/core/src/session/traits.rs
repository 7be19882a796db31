//! Trait definitions for the session module.

use async_trait::async_trait;
use std::sync::Arc;

use super::error::SessionError;
use super::types::{Anchor, Cookie, ResponseWatch};

/// A browser automation context that can open pages.
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    /// Returns the name of this backend implementation.
    fn name(&self) -> &str;

    /// Opens a new blank page.
    async fn open_page(&self) -> Result<Arc<dyn PageHandle>, SessionError>;

    /// Releases the browser. Attached browsers are left running.
    async fn shutdown(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// One open page (tab) in the browser.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigates and waits for the load to finish.
    async fn goto(&self, url: &str) -> Result<(), SessionError>;

    /// Returns the page's cookie jar.
    async fn cookies(&self) -> Result<Vec<Cookie>, SessionError>;

    /// Returns every `<a href>` on the page, in document order.
    async fn anchors(&self) -> Result<Vec<Anchor>, SessionError>;

    /// Returns the non-empty texts of elements matching `selector`.
    async fn breadcrumbs(&self, selector: &str) -> Result<Vec<String>, SessionError>;

    /// Starts capturing the first response whose URL contains `url_fragment`.
    ///
    /// Must be called before the navigation that triggers the response.
    async fn watch_responses(&self, url_fragment: &str) -> Result<ResponseWatch, SessionError>;

    /// Closes the page.
    async fn close(&self) -> Result<(), SessionError>;
}
