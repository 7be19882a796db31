//! Error types for the manifest module.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("Cannot read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON.
    #[error("Invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON, wrong structure.
    #[error("Unexpected manifest structure: {0}")]
    Shape(String),
}
