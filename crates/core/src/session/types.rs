//! Types shared by session backends.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::oneshot;

use super::error::SessionError;

/// A cookie from the browser's jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
        }
    }
}

/// A link found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// Absolute href as resolved by the browser.
    pub href: String,
    /// Visible link text, trimmed.
    #[serde(default)]
    pub text: String,
}

/// A network response captured while a page loaded.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Pending capture of the first response whose URL contains a fragment.
///
/// Created by [`super::PageHandle::watch_responses`] before navigating, so a
/// response fired during page load is not missed.
#[derive(Debug)]
pub struct ResponseWatch {
    fragment: String,
    rx: oneshot::Receiver<CapturedResponse>,
}

impl ResponseWatch {
    /// Creates a watch and the sender a backend uses to fulfil it.
    pub fn channel(fragment: impl Into<String>) -> (oneshot::Sender<CapturedResponse>, Self) {
        let (tx, rx) = oneshot::channel();
        (
            tx,
            Self {
                fragment: fragment.into(),
                rx,
            },
        )
    }

    /// The URL fragment this watch matches.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Waits for the matching response.
    pub async fn wait(self, timeout: Duration) -> Result<CapturedResponse, SessionError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(SessionError::WatchClosed {
                fragment: self.fragment,
            }),
            Err(_) => Err(SessionError::ResponseTimeout {
                fragment: self.fragment,
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}

/// Serializes cookies into a single `Cookie` header value.
///
/// Returns `None` for an empty jar so no empty header is sent.
pub fn cookie_header(cookies: &[Cookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header_joins_in_order() {
        let cookies = vec![
            Cookie::new("MoodleSession", "abc", "moodle.example.edu"),
            Cookie::new(".ASPXAUTH", "xyz", "panopto.example.edu"),
        ];
        assert_eq!(
            cookie_header(&cookies).as_deref(),
            Some("MoodleSession=abc; .ASPXAUTH=xyz")
        );
    }

    #[test]
    fn test_cookie_header_empty_jar() {
        assert!(cookie_header(&[]).is_none());
    }

    #[tokio::test]
    async fn test_watch_delivers_response() {
        let (tx, watch) = ResponseWatch::channel("DeliveryInfo.aspx");
        tx.send(CapturedResponse {
            url: "https://x/Panopto/Pages/Viewer/DeliveryInfo.aspx".to_string(),
            status: 200,
            body: "{}".to_string(),
        })
        .unwrap();
        let response = watch.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_watch_times_out() {
        let (_tx, watch) = ResponseWatch::channel("DeliveryInfo.aspx");
        let err = watch.wait(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, SessionError::ResponseTimeout { .. }));
    }

    #[tokio::test]
    async fn test_watch_closed_sender() {
        let (tx, watch) = ResponseWatch::channel("DeliveryInfo.aspx");
        drop(tx);
        let err = watch.wait(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, SessionError::WatchClosed { .. }));
    }
}
