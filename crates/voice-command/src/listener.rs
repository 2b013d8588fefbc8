//! Text-input listeners

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

use crate::{ListenError, SpeechListener};

/// Reads one typed phrase per line from standard input
pub struct StdinListener {
    lines: tokio::sync::Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinListener {
    pub fn new() -> Self {
        Self {
            lines: tokio::sync::Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for StdinListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechListener for StdinListener {
    async fn listen(&self, timeout: Duration) -> Result<Option<String>, ListenError> {
        let mut lines = self.lines.lock().await;
        match tokio::time::timeout(timeout, lines.next_line()).await {
            Ok(Ok(Some(line))) => {
                let line = line.trim().to_string();
                Ok((!line.is_empty()).then_some(line))
            }
            Ok(Ok(None)) => Err(ListenError::Closed),
            Ok(Err(e)) => Err(ListenError::Io(e.to_string())),
            Err(_) => Ok(None),
        }
    }
}

/// Replays a fixed script; `None` entries simulate silence
pub struct ScriptedListener {
    inputs: Mutex<VecDeque<Option<String>>>,
}

impl ScriptedListener {
    pub fn new<I>(inputs: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        Self {
            inputs: Mutex::new(inputs.into_iter().collect()),
        }
    }

    /// Script of spoken phrases with no silences
    pub fn phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(phrases.into_iter().map(|p| Some(p.into())))
    }
}

#[async_trait]
impl SpeechListener for ScriptedListener {
    async fn listen(&self, _timeout: Duration) -> Result<Option<String>, ListenError> {
        let next = self
            .inputs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(input) => {
                debug!("Simulated voice input: {:?}", input);
                Ok(input)
            }
            None => Err(ListenError::Closed),
        }
    }
}
