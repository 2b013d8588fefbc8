//! Smart Cane - Main Entry Point

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use cane_service::{checked_seconds, init_logging, install_metrics, CaneApp, Settings};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "smart-cane", version, about = "Smart cane safety assistant")]
struct Cli {
    /// Configuration file (defaults to $SMART_CANE_CONFIG or config/smart-cane)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Start the safety loop and voice listener immediately
    Run {
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        duration_secs: Option<f64>,
    },
    /// Listen for voice commands only; safety starts on the spoken start phrase
    Standby,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_logging(&settings.log);

    info!("=== Smart Cane v{} ===", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = &settings.metrics_addr {
        install_metrics(addr)?;
    }

    let app = CaneApp::build(&settings).context("failed to start smart cane")?;

    match cli.mode.unwrap_or(Mode::Run { duration_secs: None }) {
        Mode::Run { duration_secs } => {
            let limit = duration_secs
                .map(|secs| checked_seconds("--duration-secs", secs))
                .transpose()?;
            info!("Starting in active mode");
            app.start_active().await;
            wait_for_shutdown(limit).await;
        }
        Mode::Standby => {
            info!("Starting in standby mode");
            app.start_standby();
            tokio::select! {
                _ = ctrl_c() => {}
                _ = app.service().join_listener(None) => info!("Voice input ended"),
            }
        }
    }

    app.shutdown().await;
    Ok(())
}

async fn wait_for_shutdown(limit: Option<Duration>) {
    match limit {
        Some(limit) => {
            tokio::select! {
                _ = ctrl_c() => {}
                _ = tokio::time::sleep(limit) => info!("Run duration of {:?} elapsed", limit),
            }
        }
        None => ctrl_c().await,
    }
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, shutting down"),
        Err(e) => {
            warn!("Unable to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
