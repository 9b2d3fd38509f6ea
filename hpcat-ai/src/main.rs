//! hpcat-ai - historical photo cataloger
//!
//! Generates an archival description and index keywords for a photograph
//! and appends them to the description log.
//!
//! Subcommands:
//! - `serve`: HTTP API (health, catalog by URL, catalog by upload, records)
//! - `describe`: catalog one image and exit
//! - `records`: print the description log

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hpcat_ai::config::{build_cataloger, build_generator, AppConfig};
use hpcat_ai::services::{normalize_title, DescriptionLog, ImageSource};
use hpcat_ai::{AppState, CatalogError};
use hpcat_common::config::TomlConfig;

/// Command-line arguments for hpcat-ai
#[derive(Parser, Debug)]
#[command(name = "hpcat-ai")]
#[command(about = "Archival descriptions and keywords for historical photographs")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Folder holding the metadata file and the description log
    #[arg(short, long, global = true, env = "HPCAT_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Catalog one image and print the new record
    #[command(group(ArgGroup::new("image").required(true).args(["url", "file"])))]
    Describe {
        /// Remote image URL
        #[arg(long)]
        url: Option<String>,

        /// Local JPEG or PNG file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Archival title, used as the metadata and log lookup key
        #[arg(short, long)]
        title: String,
    },

    /// Print the description log as JSON
    Records,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = hpcat_common::config::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing
    let level = &toml_config.logging.level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("hpcat_ai={0},hpcat_common={0},tower_http={0}", level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("hpcat-ai {}", env!("CARGO_PKG_VERSION"));

    let port = match &args.command {
        Command::Serve { port } => *port,
        _ => None,
    };
    let config = AppConfig::resolve(args.root_folder.clone(), port, &toml_config)
        .context("Invalid configuration")?;
    info!("Root folder: {}", config.root_folder.display());

    match args.command {
        Command::Serve { .. } => serve(&config, &toml_config).await,
        Command::Describe { url, file, title } => {
            describe(&config, &toml_config, url, file, &title).await
        }
        Command::Records => print_records(&config),
    }
}

async fn serve(config: &AppConfig, toml_config: &TomlConfig) -> Result<()> {
    let generator = build_generator(config, toml_config).context("Failed to configure generator")?;
    let cataloger = build_cataloger(config, generator).context("Failed to load archive data")?;
    let log = DescriptionLog::load(&config.log_path).context("Failed to load description log")?;
    info!(
        metadata_entries = cataloger.metadata().len(),
        records = log.len(),
        "Archive data loaded"
    );

    let state = AppState::new(cataloger, log, ImageSource::new()?);
    let app = hpcat_ai::build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn describe(
    config: &AppConfig,
    toml_config: &TomlConfig,
    url: Option<String>,
    file: Option<PathBuf>,
    title: &str,
) -> Result<()> {
    let title = normalize_title(title)?;
    let generator = build_generator(config, toml_config).context("Failed to configure generator")?;
    let cataloger = build_cataloger(config, generator).context("Failed to load archive data")?;
    let mut log =
        DescriptionLog::load(&config.log_path).context("Failed to load description log")?;

    let images = ImageSource::new()?;
    let image_ref = match (url, file) {
        (Some(url), _) => images.validate_url(&url).await?,
        (None, Some(file)) => images.validate_file(&file)?,
        (None, None) => anyhow::bail!("Either --url or --file is required"),
    };

    match cataloger.session(&mut log).run(&image_ref, title).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome.record)?);
            Ok(())
        }
        Err(CatalogError::Persistence { record, source }) => {
            // Still show what was generated so it is not lost with the process
            println!("{}", serde_json::to_string_pretty(&record)?);
            error!(path = %config.log_path.display(), "Record was not saved");
            Err(anyhow::Error::new(source).context("Failed to persist description log"))
        }
        Err(e) => Err(e.into()),
    }
}

fn print_records(config: &AppConfig) -> Result<()> {
    let log = DescriptionLog::load(&config.log_path).context("Failed to load description log")?;
    info!(path = %config.log_path.display(), records = log.len(), "Description log loaded");
    println!("{}", serde_json::to_string_pretty(log.records())?);
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
