//! Safety Orchestration
//!
//! The event-triggered core of the cane:
//! 1. A ToF trigger wakes the camera
//! 2. Camera detections and the trigger distance become typed events
//! 3. Dangerous events are spoken (high priority) and logged
//! 4. High-severity events notify the caregiver, throttled by a cooldown
//!
//! [`SafetyRunner`] keeps the loop alive on a background task and
//! [`VoiceControlService`] ties it to spoken start/stop commands.

mod analysis;
mod orchestrator;
mod phrases;
mod runner;
mod service;
mod window;

pub use analysis::{sanitize_component, AnalysisRecord, AnalysisSink, AnalysisWriter};
pub use orchestrator::{Collaborators, Orchestrator};
pub use phrases::{alert_sentence, translate_label};
pub use runner::SafetyRunner;
pub use service::VoiceControlService;
pub use window::SlidingWindow;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Analysis log error types
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Safety loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Sleep between cycles (seconds)
    pub loop_interval_secs: f64,
    /// Default length of a bounded `main_loop` run (seconds)
    pub run_duration_secs: f64,
    /// Rewrite alerts and summarize danger events through the language model
    pub use_understanding: bool,
    /// Analysis record directory
    pub analysis_dir: PathBuf,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            loop_interval_secs: 0.02,
            run_duration_secs: 60.0,
            use_understanding: true,
            analysis_dir: PathBuf::from("./data/analyze"),
        }
    }
}

impl OrchestratorConfig {
    /// Sleep between cycles; unrepresentable values fall back to 20 ms
    pub fn loop_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.loop_interval_secs.max(0.0))
            .unwrap_or(Duration::from_millis(20))
    }

    /// Bounded run length; `None` (infinite or too large) means run until stopped
    pub fn run_duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.run_duration_secs.max(0.0)).ok()
    }

    /// Recent-event window length: about one second of cycles
    pub fn window_capacity(&self) -> usize {
        let cycles = 1.0 / self.loop_interval_secs.max(0.01);
        (cycles.round() as usize).max(1)
    }
}
