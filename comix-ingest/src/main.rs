//! comix-ingest - comic library ingest service
//!
//! Scans a library folder for comic archives, registers new ones and
//! drives each through the lifecycle until its pages are hashed and the
//! comic is stable. Passes repeat on an interval until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use comix_common::config::{database_path, default_config_path, load_toml_config, resolve_root_folder};
use comix_ingest::config::IngestSettings;
use comix_ingest::store::SqliteComicStore;
use comix_ingest::IngestContext;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for comix-ingest
#[derive(Parser, Debug)]
#[command(name = "comix-ingest")]
#[command(about = "Comic archive ingest service")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long, env = "COMIX_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "COMIX_CONFIG")]
    config: Option<PathBuf>,

    /// Folder scanned for comic archives
    #[arg(short, long, env = "COMIX_LIBRARY")]
    library: Option<PathBuf>,

    /// Run a single ingestion pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path).context("Failed to load configuration")?,
        None => Default::default(),
    };

    let file_layer = match &toml_config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("comix_ingest={0},comix_common={0}", toml_config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    info!("Starting comix-ingest");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), Some(&toml_config));
    let library = args
        .library
        .clone()
        .or_else(|| toml_config.library_folder.clone())
        .unwrap_or_else(|| root_folder.join("library"));
    info!(root = %root_folder.display(), library = %library.display(), "Folders resolved");

    let db_path = database_path(&root_folder);
    let pool = comix_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;
    info!(database = %db_path.display(), "Database connection established");

    let settings = IngestSettings::resolve(&toml_config);
    let interval = settings.job_interval;
    let context = IngestContext::new(Arc::new(SqliteComicStore::new(pool)), settings);

    if args.once {
        let summary = context.importer.run_once(&library).await?;
        info!(?summary, "Single pass finished");
        return Ok(());
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = context.importer.run_once(&library).await {
                    error!(error = %e, "Ingestion pass failed");
                }
            }
            _ = &mut shutdown => {
                context.scheduler.stop_all();
                break;
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
