//! Indirect-video strategy: landing page, viewer link, delivery manifest.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::naming::sanitize;
use crate::session::{Anchor, SessionBroker};

use super::error::ResolveError;
use super::strategy::Patterns;
use super::types::{ContentKind, ResolvedTransfer, ResourceRef};

const DEFAULT_SESSION_NAME: &str = "lecture";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DeliveryInfo {
    delivery: Option<Delivery>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Delivery {
    session_name: Option<String>,
    #[serde(default)]
    podcast_streams: Vec<Stream>,
    #[serde(default)]
    streams: Vec<Stream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Stream {
    stream_url: Option<String>,
}

/// The parts of a delivery manifest the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryStream {
    pub stream_url: String,
    pub content_kind: ContentKind,
    pub filename: String,
}

pub(super) async fn resolve(
    broker: &SessionBroker,
    config: &ResolverConfig,
    patterns: &Patterns,
    resource: &ResourceRef,
) -> Result<ResolvedTransfer, ResolveError> {
    let landing_url = resource.entry_url.as_str();

    let (breadcrumbs, viewer_url) = broker
        .with_page(|page| async move {
            broker.navigate(page.as_ref(), landing_url).await?;

            let breadcrumbs = match page.breadcrumbs(&config.breadcrumb_selector).await {
                Ok(crumbs) => crumbs,
                Err(e) => {
                    warn!(error = %e, url = landing_url, "Could not read breadcrumbs");
                    Vec::new()
                }
            };

            let anchors = page.anchors().await?;
            let viewer = find_viewer_link(&anchors, landing_url, patterns).ok_or_else(|| {
                ResolveError::NotFound {
                    url: landing_url.to_string(),
                }
            })?;
            Ok::<_, ResolveError>((breadcrumbs, viewer))
        })
        .await?;

    debug!(viewer = %viewer_url, crumbs = breadcrumbs.len(), "Found viewer link");

    let timeout = Duration::from_secs(config.manifest_timeout_secs);
    let (body, cookie) = broker
        .with_page(|page| {
            let viewer_url = viewer_url.as_str();
            async move {
                // Armed before navigating so a manifest fetched during load is seen.
                let watch = page.watch_responses(&config.delivery_endpoint).await?;
                debug!(fragment = watch.fragment(), "Watching for delivery manifest");
                broker.navigate(page.as_ref(), viewer_url).await?;
                let response = watch.wait(timeout).await?;
                if !(200..300).contains(&response.status) {
                    return Err(ResolveError::MalformedManifest(format!(
                        "manifest request returned HTTP {}",
                        response.status
                    )));
                }
                let cookie = broker.cookie_header(page.as_ref()).await?;
                Ok::<_, ResolveError>((response.body, cookie))
            }
        })
        .await?;

    let stream = parse_delivery(&body, config.allow_hls_fallback)?;
    info!(
        filename = %stream.filename,
        kind = ?stream.content_kind,
        "Resolved delivery stream"
    );

    Ok(ResolvedTransfer {
        transfer_url: stream.stream_url,
        auth_headers: cookie
            .map(|c| vec![("Cookie".to_string(), c)])
            .unwrap_or_default(),
        suggested_filename: stream.filename,
        content_kind: stream.content_kind,
        breadcrumbs,
    })
}

/// First anchor matching the viewer pattern, else the landing URL if it matches.
pub fn find_viewer_link(anchors: &[Anchor], landing_url: &str, patterns: &Patterns) -> Option<String> {
    anchors
        .iter()
        .find(|a| patterns.is_viewer(&a.href))
        .map(|a| a.href.clone())
        .or_else(|| patterns.is_viewer(landing_url).then(|| landing_url.to_string()))
}

/// Extracts the stream URL and filename from a delivery manifest body.
///
/// The podcast (progressive MP4) stream is preferred. The adaptive stream is
/// only used when `allow_hls_fallback` is set.
pub fn parse_delivery(body: &str, allow_hls_fallback: bool) -> Result<DeliveryStream, ResolveError> {
    let info: DeliveryInfo =
        serde_json::from_str(body).map_err(|e| ResolveError::MalformedManifest(e.to_string()))?;
    let delivery = info.delivery.ok_or(ResolveError::MissingStream)?;

    let session_name = delivery
        .session_name
        .as_deref()
        .map(sanitize)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string());
    let filename = format!("{}.mp4", session_name);

    let first_url = |streams: &[Stream]| {
        streams
            .first()
            .and_then(|s| s.stream_url.clone())
            .filter(|u| !u.is_empty())
    };

    if let Some(url) = first_url(&delivery.podcast_streams) {
        return Ok(DeliveryStream {
            stream_url: url,
            content_kind: ContentKind::Media,
            filename,
        });
    }

    if allow_hls_fallback {
        if let Some(url) = first_url(&delivery.streams) {
            return Ok(DeliveryStream {
                stream_url: url,
                content_kind: ContentKind::Playlist,
                filename,
            });
        }
    }

    Err(ResolveError::MissingStream)
}
