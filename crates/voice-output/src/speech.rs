//! Speech synthesis sinks

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{SpeechError, VoiceConfig};

/// Text-to-speech collaborator; returns once the sentence has been spoken
#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<(), SpeechError>;
}

/// Speaks by running an external program, e.g. `espeak -v zh <text>`
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build from config; `None` when no program is configured
    pub fn from_config(config: &VoiceConfig) -> Option<Self> {
        config.tts_program.as_ref().map(|program| {
            Self::new(
                program.clone(),
                config.tts_args.clone(),
                config.synth_timeout(),
            )
        })
    }
}

#[async_trait]
impl SpeechSink for CommandSpeech {
    async fn synthesize(&self, text: &str) -> Result<(), SpeechError> {
        debug!("Speaking via {}: {}", self.program, text);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpeechError::Launch {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        let status = tokio::time::timeout(self.timeout, child.wait())
            .await
            .map_err(|_| SpeechError::Timeout(self.timeout))?
            .map_err(|e| SpeechError::Exit(e.to_string()))?;

        if status.success() {
            Ok(())
        } else {
            Err(SpeechError::Exit(status.to_string()))
        }
    }
}

/// Writes sentences to the log (headless rigs)
#[derive(Debug, Default)]
pub struct LogSpeech;

#[async_trait]
impl SpeechSink for LogSpeech {
    async fn synthesize(&self, text: &str) -> Result<(), SpeechError> {
        info!("[TTS] {}", text);
        Ok(())
    }
}
