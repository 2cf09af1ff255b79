//! Event dispatcher — per-user ordered lanes over a channel's event stream.
//!
//! Events for one user are handled strictly in arrival order on that user's
//! lane; different users progress concurrently. A lane retires after sitting
//! idle for `lane_idle`. On shutdown every lane finishes its queued events
//! and in-flight sink writes are flushed before the channel closes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::channels::{Channel, EventKind, EventStream, IncomingEvent, UserId};
use crate::error::Result;

use super::controller::{Disposition, FormController};
use super::i18n::{Msg, text};
use super::render::Prompt;

type Lane = mpsc::UnboundedSender<IncomingEvent>;

/// Upper bound on draining lanes, and separately on flushing sink writes,
/// at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

pub struct Dispatcher {
    controller: Arc<FormController>,
    channel: Arc<dyn Channel>,
    lanes: Mutex<HashMap<UserId, Lane>>,
    lane_tasks: Mutex<JoinSet<()>>,
    lane_idle: Duration,
}

impl Dispatcher {
    pub fn new(controller: Arc<FormController>, channel: Arc<dyn Channel>, lane_idle: Duration) -> Arc<Self> {
        Arc::new(Self {
            controller,
            channel,
            lanes: Mutex::new(HashMap::new()),
            lane_tasks: Mutex::new(JoinSet::new()),
            lane_idle,
        })
    }

    /// Start the channel and handle its events until it stops or Ctrl+C arrives.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let events = self.channel.start().await?;
        self.run_stream(events).await;
        Ok(())
    }

    /// Consume the stream until it ends or Ctrl+C arrives, then drain.
    pub async fn run_stream(self: Arc<Self>, mut events: EventStream) {
        info!(channel = self.channel.name(), "Intake dispatcher listening");
        loop {
            let event = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, shutting down...");
                    break;
                }
                event = events.next() => match event {
                    Some(event) => event,
                    None => {
                        info!("Channel stream ended, shutting down...");
                        break;
                    }
                },
            };
            self.dispatch(event).await;
        }

        self.drain().await;
        self.controller.flush(SHUTDOWN_GRACE).await;

        if let Err(e) = self.channel.shutdown().await {
            warn!(channel = self.channel.name(), error = %e, "Channel shutdown failed");
        }
    }

    /// Queue an event on its user's lane, opening the lane if needed.
    pub async fn dispatch(self: &Arc<Self>, event: IncomingEvent) {
        let user_id = event.user_id;
        let mut lanes = self.lanes.lock().await;

        let event = match lanes.get(&user_id) {
            Some(lane) => match lane.send(event) {
                Ok(()) => return,
                // The lane task died; open a fresh one.
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        // rx is alive, so this cannot fail.
        let _ = tx.send(event);
        lanes.insert(user_id, tx);
        debug!(user_id, "Opened event lane");

        let this = Arc::clone(self);
        let mut tasks = self.lane_tasks.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move { this.drain_lane(user_id, rx).await });
    }

    /// Close every lane and wait for the queued events to be handled.
    async fn drain(&self) {
        // Dropping the senders ends each lane once its queue is empty.
        let closed = std::mem::take(&mut *self.lanes.lock().await).len();
        let mut tasks = std::mem::take(&mut *self.lane_tasks.lock().await);
        debug!(lanes = closed, "Draining event lanes");

        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Event lane task failed");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(remaining = tasks.len(), "Abandoning event lanes still busy at shutdown");
        }
    }

    /// Number of users with an open lane.
    pub async fn active_lanes(&self) -> usize {
        self.lanes.lock().await.len()
    }

    async fn drain_lane(&self, user_id: UserId, mut rx: mpsc::UnboundedReceiver<IncomingEvent>) {
        loop {
            let event = match tokio::time::timeout(self.lane_idle, rx.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(_) => {
                    // Retire under the map lock so no event slips in between
                    // the last check and removal.
                    let mut lanes = self.lanes.lock().await;
                    match rx.try_recv() {
                        Ok(event) => event,
                        Err(_) => {
                            lanes.remove(&user_id);
                            debug!(user_id, "Retired idle event lane");
                            break;
                        }
                    }
                }
            };
            self.process(event).await;
        }
    }

    async fn process(&self, event: IncomingEvent) {
        let disposition = self.controller.handle(&event, self.channel.as_ref()).await;
        if disposition == Disposition::Handled || !matches!(event.kind, EventKind::Text(_)) {
            return;
        }

        let lang = self.controller.language_for(&event).await;
        let hint = Prompt::text(text(lang, Msg::FallbackHint));
        if let Err(e) = self.channel.send_or_edit(&event.reply_target(), &hint).await {
            warn!(user_id = event.user_id, error = %e, "Failed to send fallback hint");
        }
    }
}
