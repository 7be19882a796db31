//! Session broker: the authenticated browser context.
//!
//! The broker owns one browser for the whole run and hands out short-lived
//! pages. Everything that touches the browser goes through the
//! [`BrowserBackend`] and [`PageHandle`] traits so resolution logic can run
//! against [`crate::testing::MockBrowser`] in tests.
//!
//! # Example
//!
//! ```ignore
//! use lectern_core::session::SessionBroker;
//!
//! let broker = SessionBroker::acquire(&config.session).await?;
//! let cookies = broker
//!     .with_page(|page| async {
//!         broker.navigate(page.as_ref(), "https://moodle.example.edu/").await?;
//!         broker.cookie_header(page.as_ref()).await
//!     })
//!     .await?;
//! ```

mod broker;
mod chromium;
mod error;
mod traits;
mod types;

pub use broker::SessionBroker;
pub use chromium::ChromiumBackend;
pub use error::SessionError;
pub use traits::{BrowserBackend, PageHandle};
pub use types::{cookie_header, Anchor, CapturedResponse, Cookie, ResponseWatch};
