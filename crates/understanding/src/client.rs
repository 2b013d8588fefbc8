//! Ollama OpenAI-compatible client

use async_trait::async_trait;
use cane_events::Event;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::model::{parse_model_list, select_model};
use crate::prompt::{
    caregiver_fallback, caregiver_prompt, summary_line, voice_prompt, CAREGIVER_SYSTEM_PROMPT,
    VOICE_SYSTEM_PROMPT,
};
use crate::{RewriteError, TextRewriter, UnderstandingConfig};

/// Client for a local Ollama server
///
/// The chosen model is resolved lazily on first use and cached for the
/// lifetime of the client. An unreachable server is retried on the next
/// call rather than cached.
pub struct OllamaClient {
    http: reqwest::Client,
    config: UnderstandingConfig,
    active_model: Mutex<Option<String>>,
}

impl OllamaClient {
    pub fn new(config: UnderstandingConfig) -> Result<Self, RewriteError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        info!(
            "Understanding layer: {} (model {}, enabled={})",
            config.base_url, config.model, config.enabled
        );
        Ok(Self {
            http,
            config,
            active_model: Mutex::new(None),
        })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    async fn list_models(&self) -> Result<Vec<String>, RewriteError> {
        let payload: Value = self
            .http
            .get(format!("{}/v1/models", self.base()))
            .timeout(self.config.list_timeout())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(parse_model_list(&payload))
    }

    /// Model used for requests; `None` when the server lists no models
    pub async fn active_model(&self) -> Option<String> {
        let mut cached = self.active_model.lock().await;
        if let Some(model) = cached.as_ref() {
            return Some(model.clone());
        }

        match self.list_models().await {
            Ok(models) => {
                let chosen = select_model(&self.config.model, Some(models.as_slice()));
                match &chosen {
                    Some(model) if *model != self.config.model => warn!(
                        "Ollama model {} not found, falling back to {}",
                        self.config.model, model
                    ),
                    None => error!("Ollama model {} not found, no models on server", self.config.model),
                    _ => {}
                }
                *cached = chosen.clone();
                chosen
            }
            Err(e) => {
                debug!("Ollama model listing unavailable: {}", e);
                Some(self.config.model.clone())
            }
        }
    }

    async fn chat(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<String, RewriteError> {
        let payload = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": temperature,
        });

        let data: Value = self
            .http
            .post(format!("{}/v1/chat/completions", self.base()))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        extract_reply(&data).ok_or(RewriteError::EmptyResponse)
    }

    async fn usable_model(&self) -> Option<String> {
        if !self.config.enabled {
            return None;
        }
        self.active_model().await
    }
}

/// First choice's message content (or legacy `text`), trimmed
fn extract_reply(data: &Value) -> Option<String> {
    let choice = data.get("choices")?.get(0)?;
    choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .or_else(|| choice.get("text").and_then(Value::as_str))
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl TextRewriter for OllamaClient {
    async fn rewrite(&self, events: &[Event], original: &str) -> (String, bool) {
        let Some(model) = self.usable_model().await else {
            return (original.to_string(), false);
        };
        let Some(prompt) = voice_prompt(events, original) else {
            return (original.to_string(), false);
        };

        match self.chat(&model, VOICE_SYSTEM_PROMPT, &prompt, 0.2).await {
            Ok(text) => (text, true),
            Err(e) => {
                warn!("Ollama rewrite failed: {}", e);
                (original.to_string(), false)
            }
        }
    }

    async fn summarize(&self, events: &[Event]) -> String {
        match self.usable_model().await {
            Some(model) => summary_line(&self.config.base_url, &model, events),
            None => String::new(),
        }
    }

    async fn rewrite_for_caregiver(&self, events: &[Event], original: &str) -> String {
        let Some(model) = self.usable_model().await else {
            return caregiver_fallback(original, false);
        };
        let Some(prompt) = caregiver_prompt(events, original) else {
            return caregiver_fallback(original, true);
        };

        match self.chat(&model, CAREGIVER_SYSTEM_PROMPT, &prompt, 0.1).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Ollama caregiver rewrite failed: {}", e);
                caregiver_fallback(original, true)
            }
        }
    }
}
