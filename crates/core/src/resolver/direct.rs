//! Direct-listing strategy: the entry URL is the transfer URL.

use tracing::debug;
use url::Url;

use crate::config::ResolverConfig;
use crate::naming::{extension_of, sanitize_filename};
use crate::session::SessionBroker;

use super::error::ResolveError;
use super::strategy::Patterns;
use super::types::{ContentKind, ResolvedTransfer, ResourceRef};

pub(super) async fn resolve(
    broker: &SessionBroker,
    config: &ResolverConfig,
    patterns: &Patterns,
    resource: &ResourceRef,
) -> Result<ResolvedTransfer, ResolveError> {
    let mut url = Url::parse(&resource.entry_url).map_err(|e| ResolveError::InvalidUrl {
        url: resource.entry_url.clone(),
        reason: e.to_string(),
    })?;

    let cookie = broker
        .with_page(|page| async move {
            // Downloads abort navigation; the cookie jar is current either way.
            if let Err(e) = broker.navigate(page.as_ref(), &resource.entry_url).await {
                debug!(error = %e, url = %resource.entry_url, "Navigation did not complete");
            }
            broker
                .cookie_header(page.as_ref())
                .await
                .map_err(ResolveError::from)
        })
        .await?;

    let extension = resource
        .hinted_extension
        .clone()
        .or_else(|| extension_of(url.path()));
    let filename = direct_filename(resource, &url, extension.as_deref(), patterns);

    if force_download(&mut url, extension.as_deref(), config) {
        debug!(url = %url, "Appended forced-download parameter");
    }

    Ok(ResolvedTransfer {
        transfer_url: url.to_string(),
        auth_headers: cookie
            .map(|c| vec![("Cookie".to_string(), c)])
            .unwrap_or_default(),
        content_kind: ContentKind::from_name(&filename),
        suggested_filename: filename,
        breadcrumbs: Vec::new(),
    })
}

/// Picks the filename for a directly listed resource.
///
/// Placeholder or empty titles fall back to the decoded last path segment.
pub fn direct_filename(
    resource: &ResourceRef,
    url: &Url,
    extension: Option<&str>,
    patterns: &Patterns,
) -> String {
    let title = resource.display_title.trim();

    let name = if title.is_empty() || patterns.is_placeholder(title) {
        last_segment(url).unwrap_or_default()
    } else if extension_of(title).is_none() {
        match extension {
            Some(ext) => format!("{}.{}", title, ext),
            None => title.to_string(),
        }
    } else {
        title.to_string()
    };

    let fallback = format!("video.{}", extension.unwrap_or("mp4"));
    sanitize_filename(&name, &fallback)
}

/// Appends the forced-download query parameter for configured extensions.
///
/// Returns whether the URL changed. Unknown extensions and URLs that already
/// carry the parameter are left alone.
pub fn force_download(url: &mut Url, extension: Option<&str>, config: &ResolverConfig) -> bool {
    let Some(ext) = extension else {
        return false;
    };
    if !config
        .forced_download_extensions
        .iter()
        .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    {
        return false;
    }
    if url
        .query_pairs()
        .any(|(k, _)| k == config.force_download_param.as_str())
    {
        return false;
    }
    url.query_pairs_mut()
        .append_pair(&config.force_download_param, "1");
    true
}

fn last_segment(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    Some(
        urlencoding::decode(segment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| segment.to_string()),
    )
}
