//! Real-time connection hub.
//!
//! The hub is the single authority over the set of live sessions. All
//! registry mutations (register, unregister, broadcast eviction) go through
//! one control loop, which runs each request to completion before picking
//! up the next one. Reads that do not mutate (`connected_count`, lookup
//! for a direct send) take a shared lock on the registry instead.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::{
    messages::{server_events, SerializedFrame, SERVER_CONNECTION_TEXT},
    session::{EnqueueError, Session, SessionId},
};
use crate::server::metrics;

/// Default capacity of the hub's request channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

type Registry = Arc<RwLock<HashMap<SessionId, Arc<Session>>>>;

/// Error type for hub requests.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub control loop is not running")]
    Stopped,
    #[error("failed to serialize frame: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error type for direct sends.
#[derive(Debug, Error)]
pub enum SendError {
    /// No session with this identity is registered.
    #[error("session {0} is not connected")]
    NotConnected(SessionId),
    /// The session's outbound queue is closed.
    #[error("session {0} is disconnected")]
    Disconnected(SessionId),
    /// The session's outbound queue is full; the frame was dropped.
    #[error("outbound queue of session {0} is full, frame dropped")]
    QueueFull(SessionId),
    #[error("failed to serialize frame: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcome of a broadcast, as executed by the control loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions registered when the broadcast ran.
    pub recipients: usize,
    /// Sessions that got the frame enqueued.
    pub delivered: usize,
    /// Sessions evicted because their queue could not take the frame.
    pub evicted: Vec<SessionId>,
}

struct RegisterRequest {
    session: Arc<Session>,
    ack: oneshot::Sender<()>,
}

struct UnregisterRequest {
    id: SessionId,
    /// When set, only this exact session is removed.
    instance: Option<Arc<Session>>,
    ack: oneshot::Sender<bool>,
}

struct BroadcastRequest {
    frame: SerializedFrame,
    ack: oneshot::Sender<BroadcastReport>,
}

/// Handle to the hub.
///
/// Cheap to clone. The control loop stops once every handle is dropped.
#[derive(Clone)]
pub struct Hub {
    registry: Registry,
    register_tx: mpsc::Sender<RegisterRequest>,
    unregister_tx: mpsc::Sender<UnregisterRequest>,
    broadcast_tx: mpsc::Sender<BroadcastRequest>,
}

impl Hub {
    /// Create a hub and spawn its control loop on the current runtime.
    pub fn spawn(channel_capacity: usize) -> Self {
        let channel_capacity = channel_capacity.max(1);
        let registry: Registry = Arc::new(RwLock::new(HashMap::new()));
        let (register_tx, register_rx) = mpsc::channel(channel_capacity);
        let (unregister_tx, unregister_rx) = mpsc::channel(channel_capacity);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(channel_capacity);

        let control_loop = ControlLoop {
            registry: registry.clone(),
            register_rx,
            unregister_rx,
            broadcast_rx,
        };
        tokio::spawn(control_loop.run());

        Self {
            registry,
            register_tx,
            unregister_tx,
            broadcast_tx,
        }
    }

    /// Add a session to the registry.
    ///
    /// Once the control loop has applied the registration, the session has
    /// been sent a `serverConnection` frame followed by an `nUsers` frame.
    pub async fn register(&self, session: Arc<Session>) -> Result<(), HubError> {
        let (ack, done) = oneshot::channel();
        self.register_tx
            .send(RegisterRequest { session, ack })
            .await
            .map_err(|_| HubError::Stopped)?;
        done.await.map_err(|_| HubError::Stopped)
    }

    /// Remove a session and close its queue.
    ///
    /// Returns `false` if no such session was registered, which is not an error.
    pub async fn unregister(&self, id: &SessionId) -> Result<bool, HubError> {
        self.request_unregister(id.clone(), None).await
    }

    /// Remove `session` if it is still the one registered under its identity.
    ///
    /// A session that was replaced by a later registration with the same
    /// identity leaves the registry untouched.
    pub async fn release(&self, session: &Arc<Session>) -> Result<bool, HubError> {
        self.request_unregister(session.id().clone(), Some(session.clone()))
            .await
    }

    async fn request_unregister(
        &self,
        id: SessionId,
        instance: Option<Arc<Session>>,
    ) -> Result<bool, HubError> {
        let (ack, done) = oneshot::channel();
        self.unregister_tx
            .send(UnregisterRequest { id, instance, ack })
            .await
            .map_err(|_| HubError::Stopped)?;
        done.await.map_err(|_| HubError::Stopped)
    }

    /// Send a frame to every registered session.
    ///
    /// The frame is serialized once. A serialization failure aborts the
    /// broadcast before anything is enqueued. Sessions whose queue is full
    /// are evicted.
    pub async fn broadcast<T: Serialize + ?Sized>(
        &self,
        event: &str,
        data: &T,
    ) -> Result<BroadcastReport, HubError> {
        let frame = SerializedFrame::encode(event, data).inspect_err(|e| {
            warn!("Broadcast of '{}' aborted, serialization failed: {}", event, e);
        })?;
        let (ack, done) = oneshot::channel();
        self.broadcast_tx
            .send(BroadcastRequest { frame, ack })
            .await
            .map_err(|_| HubError::Stopped)?;
        done.await.map_err(|_| HubError::Stopped)
    }

    /// Send a frame to one session without waiting.
    ///
    /// If the session's queue is full the frame is dropped; the session
    /// stays connected.
    pub fn send_to_session<T: Serialize + ?Sized>(
        &self,
        id: &SessionId,
        event: &str,
        data: &T,
    ) -> Result<(), SendError> {
        let frame = SerializedFrame::encode(event, data).inspect_err(|e| {
            warn!("Failed to serialize '{}' for session {}: {}", event, id, e);
        })?;

        let session = self.registry.read().get(id).cloned();
        let Some(session) = session else {
            debug!("Dropping '{}' for unknown session {}", event, id);
            return Err(SendError::NotConnected(id.clone()));
        };

        match session.try_enqueue(frame) {
            Ok(()) => Ok(()),
            Err(EnqueueError::Full) => {
                warn!(
                    "Outbound queue of session {} is full, dropping '{}'",
                    id, event
                );
                metrics::record_ws_frame_dropped();
                Err(SendError::QueueFull(id.clone()))
            }
            Err(EnqueueError::Closed) => {
                debug!("Session {} is closed, dropping '{}'", id, event);
                Err(SendError::Disconnected(id.clone()))
            }
        }
    }

    /// Number of registered sessions. May be stale by the time it is read.
    pub fn connected_count(&self) -> usize {
        self.registry.read().len()
    }

    #[cfg(test)]
    pub(crate) fn is_connected(&self, id: &SessionId) -> bool {
        self.registry.read().contains_key(id)
    }

    /// Identities of all registered sessions.
    #[cfg(test)]
    pub(crate) fn session_ids(&self) -> Vec<SessionId> {
        self.registry.read().keys().cloned().collect()
    }
}

struct ControlLoop {
    registry: Registry,
    register_rx: mpsc::Receiver<RegisterRequest>,
    unregister_rx: mpsc::Receiver<UnregisterRequest>,
    broadcast_rx: mpsc::Receiver<BroadcastRequest>,
}

impl ControlLoop {
    async fn run(mut self) {
        debug!("Hub control loop started");
        loop {
            tokio::select! {
                Some(request) = self.register_rx.recv() => {
                    self.register(&request.session);
                    let _ = request.ack.send(());
                }
                Some(request) = self.unregister_rx.recv() => {
                    let removed = self.unregister(&request.id, request.instance.as_ref());
                    let _ = request.ack.send(removed);
                }
                Some(request) = self.broadcast_rx.recv() => {
                    let report = self.broadcast(request.frame);
                    let _ = request.ack.send(report);
                }
                else => break,
            }
        }
        self.close_all();
        info!("Hub control loop stopped");
    }

    fn register(&self, session: &Arc<Session>) {
        let count = {
            let mut registry = self.registry.write();
            if let Some(previous) = registry.insert(session.id().clone(), session.clone()) {
                if !Arc::ptr_eq(&previous, session) {
                    warn!(
                        "Session {} registered twice, closing the previous one",
                        session.id()
                    );
                    previous.close();
                }
            }
            registry.len()
        };
        metrics::set_ws_connected_sessions(count);
        debug!("Registered session {} ({} connected)", session.id(), count);

        Self::send_direct(session, server_events::SERVER_CONNECTION, SERVER_CONNECTION_TEXT);
        Self::send_direct(session, server_events::N_USERS, &count);
    }

    fn unregister(&self, id: &SessionId, instance: Option<&Arc<Session>>) -> bool {
        let (removed, count) = {
            let mut registry = self.registry.write();
            let matches = match (registry.get(id), instance) {
                (Some(current), Some(expected)) => Arc::ptr_eq(current, expected),
                (Some(_), None) => true,
                (None, _) => false,
            };
            let removed = if matches { registry.remove(id) } else { None };
            (removed, registry.len())
        };
        match removed {
            Some(session) => {
                session.close();
                metrics::set_ws_connected_sessions(count);
                debug!("Unregistered session {} ({} connected)", id, count);
                true
            }
            None => {
                debug!("Unregister of unknown session {}, ignoring", id);
                false
            }
        }
    }

    fn broadcast(&self, frame: SerializedFrame) -> BroadcastReport {
        let mut registry = self.registry.write();
        let mut report = BroadcastReport {
            recipients: registry.len(),
            ..Default::default()
        };

        for (id, session) in registry.iter() {
            match session.try_enqueue(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(reason) => {
                    warn!("Evicting session {} during broadcast ({:?})", id, reason);
                    report.evicted.push(id.clone());
                }
            }
        }
        for id in report.evicted.iter() {
            if let Some(session) = registry.remove(id) {
                session.close();
            }
            metrics::record_ws_session_evicted();
        }
        let count = registry.len();
        drop(registry);

        metrics::record_ws_broadcast();
        metrics::set_ws_connected_sessions(count);
        report
    }

    fn send_direct<T: Serialize + ?Sized>(session: &Session, event: &str, data: &T) {
        let frame = match SerializedFrame::encode(event, data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to serialize '{}': {}", event, e);
                return;
            }
        };
        if let Err(reason) = session.try_enqueue(frame) {
            warn!(
                "Could not send '{}' to session {} ({:?}), dropping",
                event,
                session.id(),
                reason
            );
            if reason == EnqueueError::Full {
                metrics::record_ws_frame_dropped();
            }
        }
    }

    fn close_all(&self) {
        let mut registry = self.registry.write();
        for (_, session) in registry.drain() {
            session.close();
        }
        metrics::set_ws_connected_sessions(0);
    }
}
