//! Telegram channel — long-polls the Bot API for messages and button presses.
//!
//! Prompts are sent with inline keyboards; re-renders of a pressed keyboard
//! edit the original message in place.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::channels::{Channel, EventKind, EventStream, IncomingEvent, MessageTarget, parse_command};
use crate::error::ChannelError;
use crate::intake::Prompt;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Error description Telegram returns when an edit would change nothing.
const NOT_MODIFIED: &str = "message is not modified";

/// Pause before re-polling after a failed or malformed getUpdates.
const POLL_BACKOFF: std::time::Duration = std::time::Duration::from_secs(5);

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            api_base: DEFAULT_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the channel at a different Bot API server.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token.expose_secret())
    }

    /// Check if a username is in the allowed list.
    pub fn is_user_allowed(&self, username: &str) -> bool {
        self.allowed_users.iter().any(|u| u == "*" || u == username)
    }

    /// Check if any of the provided identities is allowed.
    pub fn is_any_user_allowed<'a, I>(&self, identities: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        identities.into_iter().any(|id| self.is_user_allowed(id))
    }

    async fn post(&self, method: &str, body: &Value) -> Result<reqwest::Response, ChannelError> {
        self.client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })
    }

    async fn send_message(&self, chat_id: i64, prompt: &Prompt) -> Result<(), ChannelError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": prompt.text,
        });
        if let Some(markup) = reply_markup(prompt) {
            body["reply_markup"] = markup;
        }

        let resp = self.post("sendMessage", &body).await?;
        if resp.status().is_success() {
            return Ok(());
        }
        let status = resp.status();
        let err = resp.text().await.unwrap_or_default();
        Err(ChannelError::SendFailed {
            name: "telegram".into(),
            reason: format!("sendMessage returned {status}: {err}"),
        })
    }

    /// Edit a message's text and keyboard. `Ok(false)` means the edit was
    /// refused and the caller should send a new message instead.
    async fn edit_message(&self, chat_id: i64, message_id: i64, prompt: &Prompt) -> Result<bool, ChannelError> {
        let mut body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": prompt.text,
        });
        if let Some(markup) = reply_markup(prompt) {
            body["reply_markup"] = markup;
        }

        let resp = self.post("editMessageText", &body).await?;
        if resp.status().is_success() {
            return Ok(true);
        }

        let status = resp.status();
        let err = resp.text().await.unwrap_or_default();
        if err.contains(NOT_MODIFIED) {
            return Ok(true);
        }
        tracing::warn!(
            status = ?status,
            chat_id,
            message_id,
            "Telegram editMessageText failed; sending a new message instead"
        );
        Ok(false)
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let ack_url = self.api_url("answerCallbackQuery");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let body = json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_BACKOFF).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(POLL_BACKOFF).await;
                        continue;
                    }
                };

                if data.get("ok").and_then(Value::as_bool) == Some(false) {
                    let err = ChannelError::InvalidUpdate(
                        data.get("description")
                            .and_then(Value::as_str)
                            .unwrap_or("getUpdates returned ok=false")
                            .to_string(),
                    );
                    tracing::warn!("Telegram poll error: {err}");
                    tokio::time::sleep(POLL_BACKOFF).await;
                    continue;
                }

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    tracing::warn!("Telegram poll error: getUpdates returned no result list");
                    tokio::time::sleep(POLL_BACKOFF).await;
                    continue;
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(parsed) = parse_update(update) else {
                        continue;
                    };

                    // Check allowlist against both username and numeric ID
                    let user_id = parsed.event.user_id.to_string();
                    let username = parsed.username.as_deref().unwrap_or("unknown");
                    if !check_user_allowed(&allowed_users, [username, user_id.as_str()]) {
                        tracing::warn!(
                            "Telegram: ignoring update from unauthorized user: \
                             username={username}, user_id={user_id}"
                        );
                        // Stop the client's spinner even though the press is dropped.
                        if let EventKind::Button { callback_id, .. } = &parsed.event.kind {
                            if let Err(e) = answer_callback(&client, &ack_url, callback_id).await {
                                tracing::warn!("Telegram: {e}");
                            }
                        }
                        continue;
                    }

                    if tx.send(parsed.event).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send_or_edit(&self, target: &MessageTarget, prompt: &Prompt) -> Result<(), ChannelError> {
        if let Some(message_id) = target.message_id {
            if self.edit_message(target.chat_id, message_id, prompt).await? {
                return Ok(());
            }
        }
        self.send_message(target.chat_id, prompt).await
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), ChannelError> {
        answer_callback(&self.client, &self.api_url("answerCallbackQuery"), callback_id).await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

async fn answer_callback(client: &reqwest::Client, url: &str, callback_id: &str) -> Result<(), ChannelError> {
    let body = json!({ "callback_query_id": callback_id });
    let resp = client
        .post(url)
        .json(&body)
        .send()
        .await
        .map_err(|e| ChannelError::AckFailed {
            name: "telegram".into(),
            reason: e.to_string(),
        })?;

    if resp.status().is_success() {
        Ok(())
    } else {
        Err(ChannelError::AckFailed {
            name: "telegram".into(),
            reason: format!("answerCallbackQuery returned {}", resp.status()),
        })
    }
}

/// A decoded update plus the sender's username for the allowlist.
#[derive(Debug)]
struct ParsedUpdate {
    event: IncomingEvent,
    username: Option<String>,
}

/// Decode a `message` or `callback_query` update. Other updates yield `None`.
fn parse_update(update: &Value) -> Option<ParsedUpdate> {
    if let Some(query) = update.get("callback_query") {
        let from = query.get("from")?;
        let user_id = from.get("id").and_then(Value::as_i64)?;
        let callback_id = query.get("id").and_then(Value::as_str)?;
        let data = query.get("data").and_then(Value::as_str).unwrap_or_default();
        let message = query.get("message");
        // Private chats share the user's id.
        let chat_id = message
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)
            .unwrap_or(user_id);
        let message_id = message
            .and_then(|m| m.get("message_id"))
            .and_then(Value::as_i64);

        let event = IncomingEvent::button(user_id, chat_id, callback_id, message_id, data);
        return Some(with_sender(event, from));
    }

    let message = update.get("message")?;
    let from = message.get("from")?;
    let user_id = from.get("id").and_then(Value::as_i64)?;
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)?;
    let text = message.get("text").and_then(Value::as_str)?;

    let event = match parse_command(text) {
        Some((name, args)) => IncomingEvent::command(user_id, chat_id, &name, &args),
        None => IncomingEvent::text(user_id, chat_id, text),
    };
    Some(with_sender(event, from))
}

fn with_sender(mut event: IncomingEvent, from: &Value) -> ParsedUpdate {
    if let Some(code) = from.get("language_code").and_then(Value::as_str) {
        event = event.with_language(code);
    }
    ParsedUpdate {
        event,
        username: from.get("username").and_then(Value::as_str).map(String::from),
    }
}

/// Telegram `InlineKeyboardMarkup` for a prompt, if it has a keyboard.
fn reply_markup(prompt: &Prompt) -> Option<Value> {
    let keyboard = prompt.keyboard.as_ref()?;
    let rows: Vec<Value> = keyboard
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.label, "callback_data": b.action }))
                .collect()
        })
        .collect();
    Some(json!({ "inline_keyboard": rows }))
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

// ── Tests ───────────────────────────────────────────────────────────
