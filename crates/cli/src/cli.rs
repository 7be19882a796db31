//! Command-line surface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default config file, read only if present.
pub const DEFAULT_CONFIG: &str = "lectern.toml";

#[derive(Debug, Parser)]
#[command(name = "lectern")]
#[command(about = "Archive course media from an authenticated browser session to object storage", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write a JSON summary of the run here.
    #[arg(long, global = true, value_name = "PATH")]
    pub report: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve one URL and save it locally. Nothing is uploaded.
    Probe {
        url: String,

        /// Output file. Defaults to the resolved filename.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Process a flat list of URLs, one per line.
    Batch {
        #[arg(long, default_value = "urls.txt")]
        file: PathBuf,

        /// Group (key prefix) for every item. Defaults to `storage.default_prefix`.
        #[arg(long)]
        group: Option<String>,
    },

    /// Process a hierarchical JSON manifest.
    Tree {
        file: PathBuf,
    },

    /// Process a named keyed source from the `[sources]` table.
    Source {
        name: String,
    },

    /// Resolve, transfer and upload a single URL.
    Fetch {
        url: String,

        #[arg(long)]
        group: Option<String>,

        #[arg(long)]
        title: Option<String>,
    },
}

impl Command {
    /// Whether the command writes to object storage.
    pub fn needs_storage(&self) -> bool {
        !matches!(self, Self::Probe { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Probe { .. } => "probe",
            Self::Batch { .. } => "batch",
            Self::Tree { .. } => "tree",
            Self::Source { .. } => "source",
            Self::Fetch { .. } => "fetch",
        }
    }
}

impl Cli {
    /// The config file to load, if any.
    ///
    /// An explicit `--config` must exist; the default is skipped when absent.
    pub fn config_path(&self) -> Option<PathBuf> {
        match self.config {
            Some(ref path) => Some(path.clone()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG);
                default.exists().then_some(default)
            }
        }
    }
}
