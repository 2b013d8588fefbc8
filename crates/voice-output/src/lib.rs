//! Voice Output
//!
//! Every spoken sentence goes through one [`VoiceScheduler`] so that safety
//! alerts pre-empt chatter: queued requests are spoken strictly by priority,
//! first-come within a priority class.

pub mod scheduler;
pub mod speech;

pub use scheduler::{Priority, VoiceRequest, VoiceScheduler};
pub use speech::{CommandSpeech, LogSpeech, SpeechSink};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Speech synthesis error types
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Failed to launch speech program '{program}': {reason}")]
    Launch { program: String, reason: String },

    #[error("Speech program exited with {0}")]
    Exit(String),

    #[error("Speech synthesis timed out after {0:?}")]
    Timeout(Duration),
}

/// Voice output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// External text-to-speech program; `None` logs sentences instead
    pub tts_program: Option<String>,
    /// Arguments placed before the sentence
    pub tts_args: Vec<String>,
    /// Upper bound for a single synthesis call (seconds)
    pub synth_timeout_secs: f64,
    /// Upper bound the safety loop waits for speech to finish (seconds)
    pub idle_wait_secs: f64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            tts_program: Some("espeak".to_string()),
            tts_args: vec!["-v".to_string(), "zh".to_string()],
            synth_timeout_secs: 15.0,
            idle_wait_secs: 10.0,
        }
    }
}

impl VoiceConfig {
    /// Per-sentence synthesis bound, at least 100 ms
    pub fn synth_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.synth_timeout_secs.max(0.1)).unwrap_or(Duration::from_secs(15))
    }

    /// Safety loop wait for speech to finish
    pub fn idle_wait(&self) -> Duration {
        Duration::try_from_secs_f64(self.idle_wait_secs.max(0.0)).unwrap_or(Duration::from_secs(10))
    }
}
