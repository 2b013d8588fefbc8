//! Understanding Layer
//!
//! Turns templated safety sentences into natural speech and caregiver
//! reports through an Ollama server's OpenAI-compatible API. Every
//! operation has a plain-text fallback, so an absent or slow server only
//! degrades wording, never the alert itself.

mod client;
mod model;
mod prompt;

pub use client::OllamaClient;
pub use model::{parse_model_list, select_model};
pub use prompt::{caregiver_fallback, summary_line};

use std::time::Duration;

use async_trait::async_trait;
use cane_events::Event;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rewrite error types
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Server returned status {0}")]
    Status(u16),

    #[error("Response carried no text")]
    EmptyResponse,

    #[error("No model available on server")]
    NoModel,
}

impl From<reqwest::Error> for RewriteError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => RewriteError::Status(status.as_u16()),
            None => RewriteError::Http(e.to_string()),
        }
    }
}

/// Understanding layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnderstandingConfig {
    /// Route alerts through the language model
    pub enabled: bool,
    /// Ollama server base URL
    pub base_url: String,
    /// Preferred model name
    pub model: String,
    /// Chat completion timeout (seconds)
    pub timeout_secs: f64,
    /// Model listing timeout (seconds)
    pub list_timeout_secs: f64,
}

impl Default for UnderstandingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://localhost:11434".to_string(),
            model: "gemma2:9b".to_string(),
            timeout_secs: 30.0,
            list_timeout_secs: 3.0,
        }
    }
}

impl UnderstandingConfig {
    /// Chat request timeout, at least 100 ms
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs.max(0.1)).unwrap_or(Duration::from_secs(30))
    }

    /// Model listing timeout, at least 100 ms
    pub fn list_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.list_timeout_secs.max(0.1)).unwrap_or(Duration::from_secs(3))
    }
}

/// Text rewrite collaborator
#[async_trait]
pub trait TextRewriter: Send + Sync {
    /// Friendlier spoken wording; `(original, false)` when not rewritten
    async fn rewrite(&self, events: &[Event], original: &str) -> (String, bool);

    /// One-line digest of accumulated danger events; empty when disabled
    async fn summarize(&self, events: &[Event]) -> String;

    /// Objective report for the caregiver's chat message
    async fn rewrite_for_caregiver(&self, events: &[Event], original: &str) -> String;
}

/// Rewriter used when the understanding layer is switched off
#[derive(Debug, Default)]
pub struct DisabledRewriter;

#[async_trait]
impl TextRewriter for DisabledRewriter {
    async fn rewrite(&self, _events: &[Event], original: &str) -> (String, bool) {
        (original.to_string(), false)
    }

    async fn summarize(&self, _events: &[Event]) -> String {
        String::new()
    }

    async fn rewrite_for_caregiver(&self, _events: &[Event], original: &str) -> String {
        caregiver_fallback(original, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cane_events::{EventSource, Severity};

    #[tokio::test]
    async fn test_disabled_rewriter_fallbacks() {
        let events = vec![Event::builder("tof.drop", EventSource::Tof, Severity::Critical)
            .distance_m(0.04)
            .build()
            .unwrap()];
        let rewriter = DisabledRewriter;

        assert_eq!(
            rewriter.rewrite(&events, "前方有 落差").await,
            ("前方有 落差".to_string(), false)
        );
        assert_eq!(rewriter.summarize(&events).await, "");
        assert_eq!(
            rewriter.rewrite_for_caregiver(&events, "前方有 落差").await,
            "[系統自動回報] 前方有 落差 (AI 未連線)"
        );
    }
}
