//! Layered service configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use camera_capture::CameraConfig;
use caregiver_alert::CaregiverConfig;
use hazard_classifier::HazardConfig;
use safety_orchestrator::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use tof_receiver::TofConfig;
use understanding::UnderstandingConfig;
use voice_command::CommandConfig;
use voice_output::VoiceConfig;

use crate::ServiceError;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "SMART_CANE_CONFIG";

/// Configuration file used when neither the CLI nor the environment names one
pub const DEFAULT_CONFIG_PATH: &str = "config/smart-cane";

/// Prefix for `SMART_CANE__SECTION__KEY` overrides
pub const ENV_PREFIX: &str = "SMART_CANE";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete service configuration, one section per component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log: LogConfig,
    /// Prometheus scrape address, e.g. "0.0.0.0:9000"; unset disables the exporter
    pub metrics_addr: Option<String>,
    pub tof: TofConfig,
    pub camera: CameraConfig,
    pub hazard: HazardConfig,
    pub voice: VoiceConfig,
    pub command: CommandConfig,
    pub caregiver: CaregiverConfig,
    pub understanding: UnderstandingConfig,
    pub orchestrator: OrchestratorConfig,
}

impl Settings {
    /// Load defaults, then the configuration file, then environment overrides.
    ///
    /// An explicit `path` must exist; the `SMART_CANE_CONFIG` or default
    /// file is optional. Durations that are negative, NaN, infinite or too
    /// large to represent are rejected.
    pub fn load(path: Option<&Path>) -> Result<Self, ServiceError> {
        let (source, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (
                PathBuf::from(
                    std::env::var(CONFIG_PATH_ENV)
                        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
                ),
                false,
            ),
        };

        let built = config::Config::builder()
            .add_source(config::File::from(source).required(required))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let settings: Settings = built.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ServiceError> {
        let durations = [
            ("voice.synth_timeout_secs", self.voice.synth_timeout_secs),
            ("voice.idle_wait_secs", self.voice.idle_wait_secs),
            ("command.listen_timeout_secs", self.command.listen_timeout_secs),
            ("caregiver.cooldown_secs", self.caregiver.cooldown_secs),
            ("caregiver.line.timeout_secs", self.caregiver.line.timeout_secs),
            ("understanding.timeout_secs", self.understanding.timeout_secs),
            ("understanding.list_timeout_secs", self.understanding.list_timeout_secs),
            ("orchestrator.loop_interval_secs", self.orchestrator.loop_interval_secs),
            ("orchestrator.run_duration_secs", self.orchestrator.run_duration_secs),
        ];
        for (key, value) in durations {
            checked_seconds(key, value)?;
        }
        Ok(())
    }
}

/// Convert operator-supplied seconds, rejecting values no `Duration` can hold
pub fn checked_seconds(key: &str, value: f64) -> Result<Duration, ServiceError> {
    Duration::try_from_secs_f64(value).map_err(|_| ServiceError::InvalidDuration {
        key: key.to_string(),
        value,
    })
}
