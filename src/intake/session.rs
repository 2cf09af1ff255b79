//! Session store — one in-progress intake per user, with idle eviction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::channels::UserId;

use super::i18n::Language;
use super::model::ProfileDraft;
use super::state::{ExpectedInput, IntakeStep};

/// Per-user intake state.
#[derive(Debug, Clone)]
pub struct Session {
    /// Fixed when the session starts.
    pub language: Language,
    pub step: IntakeStep,
    pub expected_input: Option<ExpectedInput>,
    pub draft: ProfileDraft,
    pub last_seen: DateTime<Utc>,
}

impl Session {
    /// A fresh session waiting for the age/sex answer.
    pub fn new(language: Language) -> Self {
        let step = IntakeStep::AgeSex;
        Self {
            language,
            step,
            expected_input: step.expected_input(),
            draft: ProfileDraft::default(),
            last_seen: Utc::now(),
        }
    }

    /// Advance to the next step. Returns an error at the last stored step.
    pub fn advance(&mut self) -> Result<IntakeStep, String> {
        let next = self
            .step
            .next()
            .filter(|next| !next.is_terminal())
            .ok_or_else(|| format!("No stored step after {}", self.step))?;
        if !self.step.can_transition_to(next) {
            return Err(format!("Cannot transition from {} to {}", self.step, next));
        }
        self.step = next;
        self.expected_input = next.expected_input();
        Ok(next)
    }

    pub fn is_idle_for(&self, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_seen) > ttl
    }
}

/// In-memory sessions keyed by user.
///
/// Callers must not hold a session across I/O; every accessor takes the
/// lock for the duration of a closure only.
pub struct SessionStore {
    sessions: RwLock<HashMap<UserId, Session>>,
    ttl: TimeDelta,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        })
    }

    /// Start (or restart) the intake for a user.
    pub async fn start(&self, user_id: UserId, language: Language) {
        let replaced = self
            .sessions
            .write()
            .await
            .insert(user_id, Session::new(language))
            .is_some();
        debug!(user_id, replaced, "Intake session started");
    }

    /// Start the intake only if the user has none in progress.
    /// Returns whether a session was opened.
    pub async fn start_if_absent(&self, user_id: UserId, language: Language) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&user_id) {
            return false;
        }
        sessions.insert(user_id, Session::new(language));
        debug!(user_id, "Intake session started");
        true
    }

    /// Run `f` on the user's session, refreshing its activity timestamp.
    /// Returns `None` when the user has no session.
    pub async fn update<R>(&self, user_id: UserId, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&user_id)?;
        session.last_seen = Utc::now();
        Some(f(session))
    }

    /// Remove and return the session if `pred` holds for it.
    pub async fn remove_if(&self, user_id: UserId, pred: impl FnOnce(&Session) -> bool) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        if !pred(sessions.get(&user_id)?) {
            return None;
        }
        sessions.remove(&user_id)
    }

    pub async fn remove(&self, user_id: UserId) -> Option<Session> {
        self.sessions.write().await.remove(&user_id)
    }

    /// Snapshot of a session.
    pub async fn get(&self, user_id: UserId) -> Option<Session> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions idle for longer than the TTL. Returns how many were dropped.
    pub async fn evict_idle(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|user_id, session| {
            let keep = !session.is_idle_for(self.ttl, now);
            if !keep {
                debug!(user_id, step = %session.step, "Evicting abandoned intake session");
            }
            keep
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(count = evicted, "Evicted abandoned intake sessions");
        }
        evicted
    }
}

/// Spawn a background task that periodically evicts abandoned sessions.
pub fn spawn_eviction_task(store: Arc<SessionStore>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            store.evict_idle().await;
        }
    })
}
