//! Voice Command Handling
//!
//! A listener task feeds recognized phrases into a two-mode state machine:
//! - `Standby`: only the start phrase (and trip reports) do anything
//! - `Active`: the safety loop runs; repeated silence or gibberish falls
//!   back to `Standby`

pub mod commands;
pub mod feedback;
pub mod handler;
pub mod listener;

pub use commands::{match_command, Command};
pub use feedback::FeedbackSpeaker;
pub use handler::{CommandHandler, CommandMode};
pub use listener::{ScriptedListener, StdinListener};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Listener error types
#[derive(Error, Debug)]
pub enum ListenError {
    /// The input source is exhausted; the listen loop ends
    #[error("Speech input closed")]
    Closed,

    #[error("Recognition failed: {0}")]
    Recognition(String),

    #[error("Audio input error: {0}")]
    Io(String),
}

/// Speech-to-text collaborator
#[async_trait]
pub trait SpeechListener: Send + Sync {
    /// Next utterance, or `Ok(None)` if nothing intelligible was heard
    /// within `timeout`
    async fn listen(&self, timeout: Duration) -> Result<Option<String>, ListenError>;
}

/// Safety loop control invoked on mode transitions
#[async_trait]
pub trait SafetyControl: Send + Sync {
    async fn start_safety(&self);
    async fn stop_safety(&self);
}

/// Voice command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Wake words stripped before matching
    pub wake_words: Vec<String>,
    /// Listen window per utterance (seconds)
    pub listen_timeout_secs: f64,
    /// Consecutive unrecognized inputs while active before standby
    pub max_failures: u32,
    /// Replay these phrases instead of reading stdin
    pub simulated_inputs: Option<Vec<String>>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            wake_words: vec!["小A".to_string(), "嗨小A".to_string()],
            listen_timeout_secs: 5.0,
            max_failures: 3,
            simulated_inputs: None,
        }
    }
}

impl CommandConfig {
    /// Listen window, at least 100 ms
    pub fn listen_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.listen_timeout_secs.max(0.1)).unwrap_or(Duration::from_secs(5))
    }
}
