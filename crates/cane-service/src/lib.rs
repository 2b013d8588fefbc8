//! Smart Cane Service
//!
//! Process-level plumbing for the `smart-cane` binary: layered settings,
//! tracing setup, the optional Prometheus exporter and construction of the
//! full collaborator graph.

mod app;
mod settings;

pub use app::CaneApp;
pub use settings::{
    checked_seconds, LogConfig, Settings, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, ENV_PREFIX,
};

use std::net::SocketAddr;

use camera_capture::CameraError;
use caregiver_alert::NotifyError;
use metrics_exporter_prometheus::PrometheusBuilder;
use safety_orchestrator::AnalysisError;
use thiserror::Error;
use tof_receiver::TofError;
use tracing::info;
use tracing_subscriber::EnvFilter;
use understanding::RewriteError;

/// Service startup error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("ToF receiver error: {0}")]
    Tof(#[from] TofError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Language model client error: {0}")]
    Rewriter(#[from] RewriteError),

    #[error("Caregiver notifier error: {0}")]
    Notifier(#[from] NotifyError),

    #[error("Analysis log error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Metrics exporter error: {0}")]
    Metrics(String),

    #[error("Invalid duration for {key}: {value} seconds")]
    InvalidDuration { key: String, value: f64 },
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(config: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn install_metrics(addr: &str) -> Result<(), ServiceError> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| ServiceError::Metrics(format!("invalid address '{}': {}", addr, e)))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ServiceError::Metrics(e.to_string()))?;
    info!("Prometheus metrics exposed on http://{}/metrics", addr);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_metrics_address_rejected() {
        let err = install_metrics("not-an-address").unwrap_err();
        assert!(matches!(err, ServiceError::Metrics(_)));
        assert!(err.to_string().contains("not-an-address"));
    }
}
