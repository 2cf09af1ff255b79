//! Health Intake — a chat-driven, six-step health questionnaire bot.

pub mod channels;
pub mod config;
pub mod error;
pub mod intake;
