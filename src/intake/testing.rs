//! Test doubles shared by the intake unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::channels::{Channel, EventStream, MessageTarget, UserId};
use crate::error::{ChannelError, SinkError};

use super::model::FinishedProfile;
use super::render::Prompt;
use super::sink::CompletionSink;

/// Everything a channel was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(MessageTarget, Prompt),
    Ack(String),
}

/// Channel that records effects instead of talking to a chat service.
#[derive(Default)]
pub struct RecordingChannel {
    effects: Mutex<Vec<Effect>>,
}

impl RecordingChannel {
    pub fn effects(&self) -> Vec<Effect> {
        self.effects.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<Effect> {
        std::mem::take(&mut *self.effects.lock().unwrap())
    }

    /// Prompts sent so far, ignoring acknowledgments.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Send(_, p) => Some(p),
                Effect::Ack(_) => None,
            })
            .collect()
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.prompts().pop()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn send_or_edit(&self, target: &MessageTarget, prompt: &Prompt) -> Result<(), ChannelError> {
        self.effects
            .lock()
            .unwrap()
            .push(Effect::Send(*target, prompt.clone()));
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), ChannelError> {
        self.effects.lock().unwrap().push(Effect::Ack(callback_id.to_string()));
        Ok(())
    }
}

/// What a sink received.
#[derive(Debug, Clone, PartialEq)]
pub enum Saved {
    Profile(FinishedProfile),
    Feedback(UserId, String),
}

/// Sink that forwards everything to a channel, optionally failing afterwards.
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<Saved>,
    fail: bool,
}

impl RecordingSink {
    pub fn new(fail: bool) -> (Self, mpsc::UnboundedReceiver<Saved>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, fail }, rx)
    }

    fn record(&self, saved: Saved) -> Result<(), SinkError> {
        let _ = self.tx.send(saved);
        if self.fail {
            Err(SinkError::RequestFailed("sink offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CompletionSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn save_profile(&self, profile: &FinishedProfile) -> Result<(), SinkError> {
        self.record(Saved::Profile(profile.clone()))
    }

    async fn save_feedback(&self, user_id: UserId, text: &str) -> Result<(), SinkError> {
        self.record(Saved::Feedback(user_id, text.to_string()))
    }
}
