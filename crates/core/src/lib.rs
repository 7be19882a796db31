pub mod batch;
pub mod config;
pub mod manifest;
pub mod metrics;
pub mod naming;
pub mod resolver;
pub mod session;
pub mod testing;
pub mod transfer;
pub mod upload;

pub use batch::{probe, BatchRunner, BatchSummary, ItemReport, ItemState, ProbeError, ProbeReport};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use manifest::{load_manifest, ManifestEntry, ManifestError, ManifestKind};
pub use resolver::{BrowserResolver, ResolveError, ResolvedTransfer, Resolver, ResourceRef};
pub use session::{SessionBroker, SessionError};
pub use transfer::{FfmpegRemuxer, HttpFetcher, TransferArtifact, TransferEngine, TransferError};
pub use upload::{ObjectStore, S3Store, UploadCoordinator, UploadError};
