//! Transfer engine: retrieves the bytes behind a resolved URL.
//!
//! Progressive files are fetched with one authenticated GET. Playlists are
//! remuxed by FFmpeg into a single local file. Either way the result is a
//! [`TransferArtifact`] held in memory or in one scratch file.

mod engine;
mod error;
mod ffmpeg;
mod http;
mod traits;
mod types;

pub use engine::TransferEngine;
pub use error::{CleanupWarning, TransferError};
pub use ffmpeg::FfmpegRemuxer;
pub use http::HttpFetcher;
pub use traits::{Fetcher, Remuxer};
pub use types::{content_type_for, ArtifactBody, Fetched, TransferArtifact};
