//! CLI channel — stdin/stdout REPL for local testing.
//!
//! Type `/intake` to begin. Keyboards are printed with their action tags;
//! typing a tag (e.g. `form:goal:energy`) presses that button. Anything that
//! does not decode as a tag is sent as text.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, EventStream, IncomingEvent, MessageTarget, UserId, parse_command};
use crate::error::ChannelError;
use crate::intake::{FormAction, Prompt};

/// The single local user.
const LOCAL_USER: UserId = 1;

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            // Print prompt
            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(event) = parse_line(&line) else {
                            eprint!("> ");
                            continue;
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send_or_edit(&self, _target: &MessageTarget, prompt: &Prompt) -> Result<(), ChannelError> {
        println!("\n{}\n", format_prompt(prompt));
        eprint!("> ");
        Ok(())
    }

    async fn acknowledge(&self, _callback_id: &str) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Turn a stdin line into an event. Blank lines yield `None`.
fn parse_line(line: &str) -> Option<IncomingEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let event = if let Some((name, args)) = parse_command(line) {
        IncomingEvent::command(LOCAL_USER, LOCAL_USER, &name, &args)
    } else if FormAction::parse(line).is_some() {
        IncomingEvent::button(LOCAL_USER, LOCAL_USER, "cli", None, line)
    } else {
        IncomingEvent::text(LOCAL_USER, LOCAL_USER, line)
    };
    Some(event)
}

/// Prompt text followed by one line per keyboard row.
fn format_prompt(prompt: &Prompt) -> String {
    let mut out = prompt.text.clone();
    for row in prompt.keyboard.iter().flatten() {
        let buttons: Vec<String> = row
            .iter()
            .map(|b| format!("[{}] {}", b.label, b.action))
            .collect();
        out.push_str("\n  ");
        out.push_str(&buttons.join("   "));
    }
    out
}
