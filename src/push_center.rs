//! Push center: long-polls the events endpoint and dispatches the events.
//!
//! ```text
//! poll task ── GET /events?uuid=<cursor> ──► decode ──► mpsc(1) ──► dispatch task
//!                                                                      │
//!                                               default handler ◄──────┤
//!                                         per-entity-type handler ◄────┘
//! ```
//!
//! The poll task never issues two polls at once, and a single dispatch task
//! drains the channel, so handlers see notifications in the order the server
//! sent them. The channel holds one notification: a slow handler throttles
//! polling instead of queuing notifications.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{NuageError, Result};
use crate::identity::Identity;
use crate::notification::{Event, Notification};
use crate::object::Rootable;
use crate::request::Request;
use crate::response::Payload;
use crate::session::Session;

/// Query parameter carrying the last event ID.
pub const EVENT_CURSOR_PARAMETER: &str = "uuid";

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Callback invoked for every dispatched event.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    default: Option<EventHandler>,
    by_type: HashMap<String, EventHandler>,
}

struct Run {
    token: CancellationToken,
    poll: JoinHandle<()>,
    dispatch: JoinHandle<()>,
}

/// Delivers server-side change notifications to registered handlers.
///
/// Handlers are registered per [`Identity`]; the handler registered for
/// [`Identity::ALL`] is the default handler and sees every event. An event
/// whose entity type also has its own handler reaches both, default first.
///
/// # Example
///
/// ```ignore
/// let push_center = PushCenter::new(Arc::clone(&session));
/// push_center.register_handler(Identity::ALL, |event| {
///     println!("{} {}", event.event_type, event.entity_type);
/// });
/// push_center.start()?;
/// ```
pub struct PushCenter<R> {
    session: Arc<Session<R>>,
    handlers: Arc<RwLock<Handlers>>,
    last_event_id: Arc<Mutex<Option<String>>>,
    run: Mutex<Option<Run>>,
    retry_delay: Duration,
}

impl<R: Rootable + 'static> PushCenter<R> {
    pub fn new(session: Arc<Session<R>>) -> Self {
        Self {
            session,
            handlers: Arc::default(),
            last_event_id: Arc::default(),
            run: Mutex::new(None),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Pause between a failed poll and the next one. Zero retries at once.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Register `handler` for events about `identity`.
    ///
    /// Replaces any handler already registered for that identity.
    pub fn register_handler<F>(&self, identity: Identity, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(handler);
        let mut handlers = self.handlers.write();

        if identity.is_all() {
            handlers.default = Some(handler);
        } else {
            handlers.by_type.insert(identity.rest_name.to_string(), handler);
        }
    }

    pub fn unregister_handler(&self, identity: Identity) {
        let mut handlers = self.handlers.write();

        if identity.is_all() {
            handlers.default = None;
        } else {
            handlers.by_type.remove(identity.rest_name);
        }
    }

    pub fn has_handler(&self, identity: Identity) -> bool {
        let handlers = self.handlers.read();

        if identity.is_all() {
            handlers.default.is_some()
        } else {
            handlers.by_type.contains_key(identity.rest_name)
        }
    }

    pub fn is_running(&self) -> bool {
        self.run.lock().is_some()
    }

    /// Cursor of the last notification received, if any.
    pub fn last_event_id(&self) -> Option<String> {
        self.last_event_id.lock().clone()
    }

    /// Start polling. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`NuageError::PushCenterRunning`] if the push center is
    /// already running; the running loop is left as is.
    pub fn start(&self) -> Result<()> {
        let mut run = self.run.lock();
        if run.is_some() {
            return Err(NuageError::PushCenterRunning);
        }

        *self.last_event_id.lock() = None;

        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel(1);

        let poller = Poller {
            session: Arc::clone(&self.session),
            last_event_id: Arc::clone(&self.last_event_id),
            retry_delay: self.retry_delay,
            token: token.clone(),
            tx,
        };
        let poll = tokio::spawn(poller.run());
        let dispatch = tokio::spawn(dispatch(rx, Arc::clone(&self.handlers), token.clone()));

        *run = Some(Run {
            token,
            poll,
            dispatch,
        });

        tracing::info!("Push center started on {}", self.session.base_url());
        Ok(())
    }

    /// Stop polling and forget the cursor.
    ///
    /// A poll in flight is allowed to complete but its result is dropped.
    /// Stopping a stopped push center does nothing.
    pub fn stop(&self) {
        let Some(run) = self.run.lock().take() else {
            return;
        };

        run.token.cancel();
        *self.last_event_id.lock() = None;

        tracing::info!("Push center stopped");
    }

    /// Stop, abort the poll in flight if any, and wait for both tasks to
    /// finish.
    pub async fn shutdown(&self) {
        let run = self.run.lock().take();
        let Some(run) = run else {
            return;
        };

        run.token.cancel();
        *self.last_event_id.lock() = None;

        run.poll.abort();
        if let Err(err) = run.poll.await {
            if !err.is_cancelled() {
                tracing::warn!("Poll task ended abnormally: {}", err);
            }
        }
        if let Err(err) = run.dispatch.await {
            tracing::warn!("Dispatch task ended abnormally: {}", err);
        }
        tracing::info!("Push center shut down");
    }
}

impl<R> Drop for PushCenter<R> {
    fn drop(&mut self) {
        if let Some(run) = self.run.get_mut().take() {
            run.token.cancel();
        }
    }
}

struct Poller<R> {
    session: Arc<Session<R>>,
    last_event_id: Arc<Mutex<Option<String>>>,
    retry_delay: Duration,
    token: CancellationToken,
    tx: mpsc::Sender<Notification>,
}

impl<R: Rootable + 'static> Poller<R> {
    async fn run(self) {
        while !self.token.is_cancelled() {
            match self.poll().await {
                Ok(Some(notification)) => {
                    tokio::select! {
                        () = self.token.cancelled() => break,
                        sent = self.tx.send(notification) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    if self.token.is_cancelled() {
                        break;
                    }
                    tracing::error!("Error during push: {}", err);

                    if !self.retry_delay.is_zero() {
                        tokio::select! {
                            () = self.token.cancelled() => break,
                            () = tokio::time::sleep(self.retry_delay) => {}
                        }
                    }
                }
            }
        }
        tracing::debug!("Poll task exiting");
    }

    /// One poll. Returns the notification when it carries events.
    async fn poll(&self) -> Result<Option<Notification>> {
        let mut request = Request::new(format!("{}/events", self.session.base_url()));
        let cursor = self.last_event_id.lock().clone();
        if let Some(cursor) = cursor {
            request.set_parameter(EVENT_CURSOR_PARAMETER, cursor);
        }

        let response = self.session.send(&mut request, None).await?;

        let notification = match response.decode::<Notification>()? {
            Payload::Value(notification) => notification,
            Payload::Empty => return Ok(None),
        };

        {
            let mut cursor = self.last_event_id.lock();
            if self.token.is_cancelled() {
                return Ok(None);
            }
            *cursor = Some(notification.uuid.clone()).filter(|uuid| !uuid.is_empty());
        }

        tracing::debug!(
            "Received notification {} with {} events",
            notification.uuid,
            notification.events.len()
        );

        if notification.events.is_empty() {
            Ok(None)
        } else {
            Ok(Some(notification))
        }
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<Notification>,
    handlers: Arc<RwLock<Handlers>>,
    token: CancellationToken,
) {
    loop {
        let notification = tokio::select! {
            biased;
            () = token.cancelled() => break,
            received = rx.recv() => match received {
                Some(notification) => notification,
                None => break,
            },
        };

        for mut event in notification.events {
            if let Err(err) = event.derive_data() {
                tracing::error!("Unable to encode event data: {}", err);
            }

            // Handlers may register or unregister handlers.
            let (default, specific) = {
                let handlers = handlers.read();
                (
                    handlers.default.clone(),
                    handlers.by_type.get(&event.entity_type).cloned(),
                )
            };

            if let Some(handler) = default {
                handler(&event);
            }
            if let Some(handler) = specific {
                handler(&event);
            }
        }
    }
    tracing::debug!("Dispatch task exiting");
}
