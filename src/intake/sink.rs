//! Completion sinks — where finished profiles and feedback go.
//!
//! Sinks are called fire-and-forget by the controller: the user is
//! acknowledged regardless of the outcome, and failures only show up in logs.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::info;

use crate::channels::UserId;
use crate::error::SinkError;

use super::model::FinishedProfile;

#[async_trait]
pub trait CompletionSink: Send + Sync {
    fn name(&self) -> &str;

    /// Persist a finished profile.
    async fn save_profile(&self, profile: &FinishedProfile) -> Result<(), SinkError>;

    /// Persist free-form feedback text.
    async fn save_feedback(&self, user_id: UserId, text: &str) -> Result<(), SinkError>;
}

/// POSTs records as JSON to a webhook (e.g. a spreadsheet script).
pub struct WebhookSink {
    url: String,
    secret: Option<SecretString>,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, secret: Option<SecretString>) -> Self {
        Self {
            url: url.into(),
            secret,
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, body: &serde_json::Value) -> Result<(), SinkError> {
        let mut request = self.client.post(&self.url).json(body);
        if let Some(secret) = &self.secret {
            request = request.bearer_auth(secret.expose_secret());
        }

        let resp = request
            .send()
            .await
            .map_err(|e| SinkError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SinkError::Rejected { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl CompletionSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn save_profile(&self, profile: &FinishedProfile) -> Result<(), SinkError> {
        let body = json!({
            "kind": "profile",
            "record": profile.to_record(),
        });
        self.post(&body).await
    }

    async fn save_feedback(&self, user_id: UserId, text: &str) -> Result<(), SinkError> {
        let body = json!({
            "kind": "feedback",
            "user_id": user_id,
            "text": text,
        });
        self.post(&body).await
    }
}

/// Writes records to the log only. Used when no webhook is configured.
pub struct LogSink;

#[async_trait]
impl CompletionSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn save_profile(&self, profile: &FinishedProfile) -> Result<(), SinkError> {
        let record = serde_json::to_string(&profile.to_record())?;
        info!(user_id = profile.user_id, %record, "Finished profile");
        Ok(())
    }

    async fn save_feedback(&self, user_id: UserId, text: &str) -> Result<(), SinkError> {
        info!(user_id, feedback = %text, "Feedback received");
        Ok(())
    }
}
