//! LINE Messaging API push client

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::{LineConfig, NotificationSink, NotifyError};

/// Push request body for one text message
pub fn push_payload(user_id: &str, message: &str) -> Value {
    json!({
        "to": user_id,
        "messages": [{"type": "text", "text": message}],
    })
}

/// Sends caregiver messages as LINE push messages
pub struct LineNotifier {
    http: reqwest::Client,
    config: LineConfig,
}

impl LineNotifier {
    pub fn new(config: LineConfig) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        if config.channel_access_token.is_none() || config.target_user_id.is_none() {
            warn!("LINE Messaging API credentials not configured, caregiver messages will be dropped");
        }
        Ok(Self { http, config })
    }

    /// Push a message to the configured caregiver
    pub async fn push(&self, message: &str) -> Result<(), NotifyError> {
        let (Some(token), Some(user_id)) = (
            self.config.channel_access_token.as_deref().filter(|t| !t.is_empty()),
            self.config.target_user_id.as_deref().filter(|u| !u.is_empty()),
        ) else {
            return Err(NotifyError::NotConfigured);
        };

        self.http
            .post(&self.config.api_url)
            .bearer_auth(token)
            .json(&push_payload(user_id, message))
            .send()
            .await?
            .error_for_status()?;

        info!("LINE Messaging API message sent to {}", user_id);
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for LineNotifier {
    async fn send(&self, message: &str) -> bool {
        match self.push(message).await {
            Ok(()) => true,
            Err(NotifyError::NotConfigured) => {
                warn!("LINE Messaging API missing token/user id, drop message: {}", message);
                false
            }
            Err(e) => {
                error!("LINE Messaging API send failed: {}", e);
                false
            }
        }
    }
}
