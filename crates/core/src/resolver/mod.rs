//! Resource resolver: entry URL to transfer URL.
//!
//! Two strategies, picked by [`StrategyKind::for_url`]:
//!
//! - **Direct**: the entry URL already serves the bytes. The page is visited
//!   only to refresh cookies; video and slide URLs get the forced-download
//!   query parameter.
//! - **Indirect**: the entry URL is a landing page (or a viewer) and the real
//!   stream URL is announced by a delivery manifest the viewer fetches while
//!   loading. The manifest response is intercepted from the browser.
//!
//! Every failure here is recoverable: the item is skipped and the batch goes on.

mod direct;
mod error;
mod indirect;
mod strategy;
mod traits;
mod types;

pub use direct::{direct_filename, force_download};
pub use error::ResolveError;
pub use indirect::{find_viewer_link, parse_delivery, DeliveryStream};
pub use strategy::{Patterns, StrategyKind};
pub use traits::{BrowserResolver, Resolver};
pub use types::{ContentKind, ResolvedTransfer, ResourceRef};
