//! Intake form — a six-step health questionnaire driven by chat events.
//!
//! A user walks through age/sex, chronic conditions, goal, habits,
//! complaints and medications. Each step's prompt is rendered from the
//! session draft; button presses and text answers are applied by the
//! `FormController`. A finished profile is archived and handed to a
//! `CompletionSink`.

pub mod action;
pub mod archive;
pub mod controller;
pub mod dispatch;
pub mod i18n;
pub mod model;
pub mod parse;
pub mod render;
pub mod routes;
pub mod session;
pub mod sink;
pub mod state;

#[cfg(test)]
mod testing;

pub use action::FormAction;
pub use archive::ProfileArchive;
pub use controller::{Disposition, FormController};
pub use dispatch::Dispatcher;
pub use i18n::Language;
pub use model::{FinishedProfile, ProfileDraft};
pub use render::{InlineButton, Prompt, render_step};
pub use routes::{IntakeRouteState, intake_routes};
pub use session::{Session, SessionStore, spawn_eviction_task};
pub use sink::{CompletionSink, LogSink, WebhookSink};
pub use state::{ExpectedInput, IntakeStep};
