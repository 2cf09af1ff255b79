//! Channel abstraction for chat transports.
//!
//! A channel delivers three kinds of events (command, button press, text)
//! and offers two effects: send-or-edit a prompt, and acknowledge a button.

pub mod cli;
pub mod telegram;

pub use cli::CliChannel;
pub use telegram::TelegramChannel;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;
use crate::intake::render::Prompt;

/// Stable identity of a chat user.
pub type UserId = i64;

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `/name args`; `name` has no slash and no `@bot` suffix.
    Command { name: String, args: String },
    /// An inline button press.
    Button {
        callback_id: String,
        /// Message carrying the pressed keyboard, edited on re-render.
        message_id: Option<i64>,
        data: String,
    },
    /// Plain text message.
    Text(String),
}

/// An event delivered by a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingEvent {
    pub user_id: UserId,
    pub chat_id: i64,
    /// Language tag reported by the client, if any.
    pub language_code: Option<String>,
    pub kind: EventKind,
}

impl IncomingEvent {
    pub fn command(user_id: UserId, chat_id: i64, name: &str, args: &str) -> Self {
        Self::new(
            user_id,
            chat_id,
            EventKind::Command {
                name: name.to_string(),
                args: args.to_string(),
            },
        )
    }

    pub fn button(user_id: UserId, chat_id: i64, callback_id: &str, message_id: Option<i64>, data: &str) -> Self {
        Self::new(
            user_id,
            chat_id,
            EventKind::Button {
                callback_id: callback_id.to_string(),
                message_id,
                data: data.to_string(),
            },
        )
    }

    pub fn text(user_id: UserId, chat_id: i64, text: &str) -> Self {
        Self::new(user_id, chat_id, EventKind::Text(text.to_string()))
    }

    fn new(user_id: UserId, chat_id: i64, kind: EventKind) -> Self {
        Self {
            user_id,
            chat_id,
            language_code: None,
            kind,
        }
    }

    pub fn with_language(mut self, code: impl Into<String>) -> Self {
        self.language_code = Some(code.into());
        self
    }

    /// Where replies to this event go: button presses edit their own message.
    pub fn reply_target(&self) -> MessageTarget {
        match &self.kind {
            EventKind::Button { message_id, .. } => MessageTarget {
                chat_id: self.chat_id,
                message_id: *message_id,
            },
            _ => MessageTarget::new(self.chat_id),
        }
    }
}

/// Destination of an outgoing prompt. With `message_id` the message is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTarget {
    pub chat_id: i64,
    pub message_id: Option<i64>,
}

impl MessageTarget {
    /// A fresh message in `chat_id`.
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            message_id: None,
        }
    }
}

/// Stream of incoming events.
pub type EventStream = Pin<Box<dyn Stream<Item = IncomingEvent> + Send>>;

/// A chat transport.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start receiving events.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Send a new message, or edit `target.message_id` in place.
    async fn send_or_edit(&self, target: &MessageTarget, prompt: &Prompt) -> Result<(), ChannelError>;

    /// Acknowledge a button press so the client stops its spinner.
    async fn acknowledge(&self, callback_id: &str) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Split `/name@bot args` into `(name, args)`. Returns `None` for non-commands.
pub fn parse_command(text: &str) -> Option<(String, String)> {
    let rest = text.trim().strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() {
        return None;
    }
    Some((name.to_ascii_lowercase(), args.to_string()))
}
