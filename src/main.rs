//! # Main Entry Point
//!
//! Initializes the application:
//! - Domain: Configuration and Types
//! - Infrastructure: Console transport, static settings
//! - Application: Orchestrator, Registry, Tasks, Paged displays
//! - Interface: Built-in modules

mod application;
mod domain;
mod infrastructure;
mod interface;

use anyhow::{Result, bail};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::application::orchestrator::Orchestrator;
use crate::domain::config::AppConfig;
use crate::infrastructure::console::ConsoleTransport;
use crate::infrastructure::settings::StaticSettings;

#[derive(Parser)]
#[command(name = "ensemble", about = "Modular chat-bot orchestration framework")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "data/config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load Configuration
    let config = AppConfig::load(&cli.config)?;

    // 2. Logging Setup
    if !std::path::Path::new("data").exists() {
        fs::create_dir("data")?;
    }

    // Clear previous session log
    let log_path = std::path::Path::new("data/session.log");
    if log_path.exists() {
        let _ = fs::remove_file(log_path);
    }

    let file_appender = tracing_appender::rolling::never("data", "session.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("Starting Ensemble...");

    // 3. Fatal startup check: the gateway credential must be present.
    if config.services.gateway.token.trim().is_empty() {
        tracing::error!("No gateway token configured, refusing to start");
        bail!("Missing gateway token in {}", cli.config.display());
    }

    // 4. Wire the orchestrator
    let transport = Arc::new(ConsoleTransport::new(&config.services.gateway));
    let settings = Arc::new(StaticSettings::from_config(&config.prefix));
    let orchestrator = Orchestrator::new(transport, settings);

    orchestrator.add_modules(interface::modules::all(&config)).await;

    // 5. Run until the gateway closes or the process is interrupted.
    tokio::select! {
        result = orchestrator.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received, shutting down");
        }
    }

    orchestrator.shutdown().await;
    Ok(())
}
