//! Chromium backend over the DevTools protocol.

use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFinished, EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;

use super::error::SessionError;
use super::traits::{BrowserBackend, PageHandle};
use super::types::{Anchor, CapturedResponse, Cookie, ResponseWatch};

const ANCHORS_SCRIPT: &str = r#"Array.from(document.querySelectorAll('a[href]')).map(a => ({ href: a.href, text: (a.innerText || '').trim() }))"#;

/// Browser backed by a real Chromium instance.
pub struct ChromiumBackend {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    /// Launched by us (closed on shutdown) rather than attached.
    launched: bool,
}

impl ChromiumBackend {
    /// Attaches when an endpoint is configured, otherwise launches.
    pub async fn connect_or_launch(config: &SessionConfig) -> Result<Self, SessionError> {
        match (&config.endpoint, &config.profile_dir) {
            (Some(endpoint), _) => Self::connect(endpoint).await,
            (None, Some(_)) => Self::launch(config).await,
            (None, None) => Err(SessionError::NotConfigured),
        }
    }

    /// Attaches to a browser already running with remote debugging enabled.
    pub async fn connect(endpoint: &str) -> Result<Self, SessionError> {
        let (browser, mut handler) =
            Browser::connect(endpoint)
                .await
                .map_err(|e| SessionError::ConnectFailed {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler error");
                }
            }
        });

        info!(endpoint, "Attached to running browser");
        Ok(Self {
            browser: Mutex::new(browser),
            handler_task,
            launched: false,
        })
    }

    /// Launches a browser against the persistent profile directory.
    pub async fn launch(config: &SessionConfig) -> Result<Self, SessionError> {
        let profile = config
            .profile_dir
            .clone()
            .ok_or(SessionError::NotConfigured)?;

        let mut builder = BrowserConfig::builder().user_data_dir(&profile);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(ref executable) = config.executable {
            builder = builder.chrome_executable(executable);
        }
        let browser_config = builder.build().map_err(|reason| SessionError::LaunchFailed {
            profile: profile.clone(),
            reason,
        })?;

        let (browser, mut handler) =
            Browser::launch(browser_config)
                .await
                .map_err(|e| SessionError::LaunchFailed {
                    profile: profile.clone(),
                    reason: e.to_string(),
                })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler error");
                }
            }
        });

        info!(profile = %profile.display(), "Launched browser");
        Ok(Self {
            browser: Mutex::new(browser),
            handler_task,
            launched: true,
        })
    }
}

#[async_trait]
impl BrowserBackend for ChromiumBackend {
    fn name(&self) -> &str {
        "chromium"
    }

    async fn open_page(&self) -> Result<Arc<dyn PageHandle>, SessionError> {
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| SessionError::PageOpen(e.to_string()))?
        };

        // Response events are only emitted once the network domain is on.
        page.execute(EnableParams::default())
            .await
            .map_err(|e| SessionError::Protocol(e.to_string()))?;

        Ok(Arc::new(ChromiumPage { page }))
    }

    async fn shutdown(&self) -> Result<(), SessionError> {
        if self.launched {
            let mut browser = self.browser.lock().await;
            browser
                .close()
                .await
                .map_err(|e| SessionError::Protocol(e.to_string()))?;
            let _ = browser.wait().await;
        }
        self.handler_task.abort();
        Ok(())
    }
}

/// One Chromium tab.
struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    async fn response_body(page: &Page, request_id: RequestId) -> Result<String, SessionError> {
        let response = page
            .execute(GetResponseBodyParams::new(request_id))
            .await
            .map_err(|e| SessionError::Protocol(e.to_string()))?;

        if response.result.base64_encoded {
            let raw = base64::engine::general_purpose::STANDARD
                .decode(response.result.body.as_bytes())
                .map_err(|e| SessionError::Protocol(format!("invalid base64 body: {}", e)))?;
            Ok(String::from_utf8_lossy(&raw).into_owned())
        } else {
            Ok(response.result.body.clone())
        }
    }
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), SessionError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| SessionError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, SessionError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| SessionError::Protocol(e.to_string()))?;

        Ok(cookies
            .into_iter()
            .map(|c| Cookie::new(c.name, c.value, c.domain))
            .collect())
    }

    async fn anchors(&self) -> Result<Vec<Anchor>, SessionError> {
        self.page
            .evaluate(ANCHORS_SCRIPT)
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?
            .into_value::<Vec<Anchor>>()
            .map_err(|e| SessionError::Script(e.to_string()))
    }

    async fn breadcrumbs(&self, selector: &str) -> Result<Vec<String>, SessionError> {
        let quoted =
            serde_json::to_string(selector).map_err(|e| SessionError::Script(e.to_string()))?;
        let script = format!(
            "Array.from(document.querySelectorAll({})).map(e => (e.innerText || '').trim()).filter(t => t.length > 0)",
            quoted
        );
        self.page
            .evaluate(script.as_str())
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?
            .into_value::<Vec<String>>()
            .map_err(|e| SessionError::Script(e.to_string()))
    }

    async fn watch_responses(&self, url_fragment: &str) -> Result<ResponseWatch, SessionError> {
        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| SessionError::Protocol(e.to_string()))?;
        let mut finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(|e| SessionError::Protocol(e.to_string()))?;

        let (tx, watch) = ResponseWatch::channel(url_fragment);
        let fragment = url_fragment.to_string();
        let page = self.page.clone();

        tokio::spawn(async move {
            // The body is only complete once loading has finished for the request.
            let mut matched: Option<(RequestId, String, u16)> = None;
            loop {
                if tx.is_closed() {
                    break;
                }
                tokio::select! {
                    Some(event) = responses.next(), if matched.is_none() => {
                        if event.response.url.contains(&fragment) {
                            debug!(url = %event.response.url, "Matched response");
                            matched = Some((
                                event.request_id.clone(),
                                event.response.url.clone(),
                                event.response.status as u16,
                            ));
                        }
                    }
                    Some(event) = finished.next() => {
                        let Some((ref id, ref url, status)) = matched else {
                            continue;
                        };
                        if event.request_id != *id {
                            continue;
                        }
                        match Self::response_body(&page, id.clone()).await {
                            Ok(body) => {
                                let _ = tx.send(CapturedResponse {
                                    url: url.clone(),
                                    status,
                                    body,
                                });
                            }
                            Err(e) => warn!(error = %e, url = %url, "Failed to read response body"),
                        }
                        break;
                    }
                    else => break,
                }
            }
        });

        Ok(watch)
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| SessionError::Protocol(e.to_string()))
    }
}
