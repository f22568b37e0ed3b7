//! A single live client session and its outbound queue.

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::messages::SerializedFrame;

/// Default capacity of a session's outbound queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Opaque identity of a session, generated at connect time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(String);

impl SessionId {
    /// A fresh random (v4) identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reason a frame could not be placed on a session queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// The queue is at capacity; the frame was not enqueued.
    Full,
    /// The queue was closed, or its reader is gone.
    Closed,
}

/// One connected client.
///
/// The session holds the producing end of its outbound queue. The consuming
/// end is handed to the outbound pump when the session is created. Closing
/// the session drops the producer, so the pump drains whatever is already
/// queued and then sees the end of the stream.
pub struct Session {
    id: SessionId,
    capacity: usize,
    queue: Mutex<Option<mpsc::Sender<SerializedFrame>>>,
}

impl Session {
    /// Create a session with a generated identity.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SerializedFrame>) {
        Self::with_id(SessionId::generate(), capacity)
    }

    /// Create a session with the given identity.
    ///
    /// `capacity` is clamped to at least 1.
    pub fn with_id(id: SessionId, capacity: usize) -> (Self, mpsc::Receiver<SerializedFrame>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let session = Self {
            id,
            capacity,
            queue: Mutex::new(Some(tx)),
        };
        (session, rx)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Non-blocking enqueue.
    pub fn try_enqueue(&self, frame: SerializedFrame) -> Result<(), EnqueueError> {
        let queue = self.queue.lock();
        let Some(sender) = queue.as_ref() else {
            return Err(EnqueueError::Closed);
        };
        sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => EnqueueError::Full,
            TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Number of frames currently waiting in the queue.
    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        match self.queue.lock().as_ref() {
            Some(sender) => self.capacity - sender.capacity(),
            None => 0,
        }
    }

    /// Close the outbound queue. Returns `false` if it was already closed.
    pub(super) fn close(&self) -> bool {
        self.queue.lock().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        match self.queue.lock().as_ref() {
            Some(sender) => sender.is_closed(),
            None => true,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}
