mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lectern_core::batch::ScratchDir;
use lectern_core::config::LogFormat;
use lectern_core::manifest::{load_manifest, ManifestEntry, ManifestKind};
use lectern_core::metrics::encode_metrics;
use lectern_core::upload::UploadProgress;
use lectern_core::{
    load_config, probe, validate_config, BatchRunner, BrowserResolver, Config, FfmpegRemuxer,
    HttpFetcher, ObjectStore, ResourceRef, S3Store, SanitizedConfig, SessionBroker, TransferEngine,
    UploadCoordinator,
};

use cli::{Cli, Command};

/// Buffer size for upload progress events
const PROGRESS_BUFFER_SIZE: usize = 64;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config_path();
    let config = load_config(config_path.as_deref());

    init_logging(
        config
            .as_ref()
            .map(|c| c.logging.format)
            .unwrap_or_default(),
    );

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("Failed to load config from {:?}", config_path))),
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,lectern=debug,lectern_core=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    validate_config(&config, cli.command.needs_storage())
        .context("Configuration validation failed")?;
    info!(
        command = cli.command.name(),
        config = ?SanitizedConfig::from(&config),
        "Configuration loaded"
    );

    // Input problems fail before a browser is touched.
    let entries = load_entries(&cli.command, &config).await?;

    let broker = Arc::new(
        SessionBroker::acquire(&config.session)
            .await
            .context("Failed to acquire browser session")?,
    );

    let outcome = execute(&cli, &config, Arc::clone(&broker), entries).await;
    broker.shutdown().await;

    if let Some(ref path) = config.metrics.textfile {
        match encode_metrics() {
            Ok(text) => {
                if let Err(e) = tokio::fs::write(path, text).await {
                    warn!(path = %path.display(), error = %e, "Failed to write metrics textfile");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }
    }

    outcome
}

/// Reads the manifest the command names. Probe has none.
async fn load_entries(command: &Command, config: &Config) -> Result<Vec<ManifestEntry>> {
    let default_group = config.storage.default_prefix.as_str();
    let entries = match command {
        Command::Probe { .. } => Vec::new(),
        Command::Batch { file, group } => {
            let group = group.as_deref().unwrap_or(default_group);
            load_manifest(file, ManifestKind::Flat, group)
                .await
                .with_context(|| format!("Failed to read URL list {:?}", file))?
        }
        Command::Tree { file } => load_manifest(file, ManifestKind::Tree, default_group)
            .await
            .with_context(|| format!("Failed to read manifest {:?}", file))?,
        Command::Source { name } => {
            let Some(path) = config.sources.get(name) else {
                let known: Vec<&str> = config.sources.keys().map(String::as_str).collect();
                bail!("Unknown source {:?} (configured: {:?})", name, known);
            };
            load_manifest(path, ManifestKind::Keyed, default_group)
                .await
                .with_context(|| format!("Failed to read source {:?} at {:?}", name, path))?
        }
        Command::Fetch { url, group, title } => {
            let group = group.as_deref().unwrap_or(default_group);
            let resource = ResourceRef::new(url.as_str(), title.clone().unwrap_or_default());
            vec![ManifestEntry::new(group, resource)]
        }
    };
    Ok(entries)
}

async fn execute(
    cli: &Cli,
    config: &Config,
    broker: Arc<SessionBroker>,
    entries: Vec<ManifestEntry>,
) -> Result<()> {
    let resolver = Arc::new(
        BrowserResolver::new(broker, &config.resolver).context("Invalid resolver patterns")?,
    );
    let fetcher = HttpFetcher::new(&config.transfer).context("Failed to build HTTP client")?;
    let remuxer = FfmpegRemuxer::new(&config.transfer);
    let engine = TransferEngine::new(
        Arc::new(fetcher),
        Arc::new(remuxer),
        config.transfer.spool_to_disk,
    );
    info!(
        remuxer = engine.remuxer_name(),
        spool_to_disk = config.transfer.spool_to_disk,
        "Transfer engine ready"
    );

    if let Command::Probe { url, output } = &cli.command {
        let scratch = ScratchDir::create(&config.scratch.root, "probe")
            .await
            .context("Failed to create scratch directory")?;
        let resource = ResourceRef::new(url.as_str(), "");
        let result = probe(
            resolver.as_ref(),
            &engine,
            &resource,
            output.as_deref(),
            scratch.path(),
        )
        .await;
        if let Some(warning) = scratch.remove().await {
            warn!(%warning, "Scratch cleanup failed");
        }

        let report = result.context("Probe failed")?;
        info!(
            output = %report.output.display(),
            size_bytes = report.size_bytes,
            "Probe finished"
        );
        return write_report(cli.report.as_deref(), &report).await;
    }

    let store = S3Store::from_config(&config.storage).await;
    info!(
        store = store.name(),
        bucket = ?config.storage.bucket,
        "Object store ready"
    );
    let (tx, mut rx) = mpsc::channel::<UploadProgress>(PROGRESS_BUFFER_SIZE);
    tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            if let Some(total) = progress.total_bytes.filter(|t| *t > 0) {
                info!(
                    key = %progress.key,
                    percent = progress.bytes_sent * 100 / total,
                    "Uploading"
                );
            }
        }
    });
    let uploader = UploadCoordinator::new(Arc::new(store), &config.storage).with_progress(tx);

    let runner = BatchRunner::new(
        resolver,
        engine,
        uploader,
        &config.storage,
        config.scratch.root.clone(),
    );
    let summary = runner.run(entries).await;

    write_report(cli.report.as_deref(), &summary).await
}

async fn write_report<T: Serialize>(path: Option<&Path>, report: &T) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write report to {:?}", path))?;
    info!(path = %path.display(), "Report written");
    Ok(())
}
