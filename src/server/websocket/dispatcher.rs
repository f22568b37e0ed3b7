//! Inbound event dispatch.
//!
//! The dispatch table maps event names to handlers. It is built once at
//! startup, before any session is accepted, and is only read afterwards.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    hub::Hub,
    messages::Frame,
    session::SessionId,
};
use crate::server::metrics;

/// What a handler gets to know about the frame's origin.
#[derive(Clone)]
pub struct EventContext {
    pub session_id: SessionId,
    pub hub: Hub,
}

impl EventContext {
    pub fn new(session_id: SessionId, hub: Hub) -> Self {
        Self { session_id, hub }
    }

    /// Send a frame back to the session the event came from.
    ///
    /// Best effort: a reply that cannot be enqueued is logged and dropped,
    /// and the handler carries on.
    pub fn reply<T: Serialize + ?Sized>(&self, event: &str, data: &T) {
        if let Err(e) = self.hub.send_to_session(&self.session_id, event, data) {
            debug!("Reply '{}' not delivered: {}", event, e);
        }
    }
}

/// Trait implemented by every inbound event handler.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, ctx: &EventContext, data: Value) -> anyhow::Result<()>;
}

/// Result of dispatching one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    /// The handler ran and returned an error.
    Failed,
    /// No handler is registered for the event name.
    UnknownEvent,
    /// The frame is not a valid `{event, data}` object.
    Malformed,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Handled => "handled",
            DispatchOutcome::Failed => "failed",
            DispatchOutcome::UnknownEvent => "unknown",
            DispatchOutcome::Malformed => "malformed",
        }
    }
}

/// Event name -> handler table.
pub struct EventDispatcher {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler. A later registration for the same name replaces
    /// the earlier one.
    pub fn register(&mut self, event: &str, handler: impl EventHandler + 'static) {
        if self
            .handlers
            .insert(event.to_owned(), Arc::new(handler))
            .is_some()
        {
            warn!("Handler for event '{}' registered twice, replacing", event);
        }
    }

    #[cfg(test)]
    pub(crate) fn has_event(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// All registered event names, sorted.
    pub fn events(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Parse `raw` and run the matching handler to completion.
    pub async fn dispatch(&self, ctx: &EventContext, raw: &str) -> DispatchOutcome {
        let frame = match serde_json::from_str::<Frame>(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Malformed frame from session {}: {}", ctx.session_id, e);
                metrics::record_ws_inbound_event("", DispatchOutcome::Malformed.as_str());
                return DispatchOutcome::Malformed;
            }
        };

        let outcome = match self.handlers.get(&frame.event) {
            None => {
                warn!(
                    "Unknown event '{}' from session {}, ignoring",
                    frame.event, ctx.session_id
                );
                DispatchOutcome::UnknownEvent
            }
            Some(handler) => {
                debug!("Session {} -> '{}'", ctx.session_id, frame.event);
                match handler.handle(ctx, frame.data).await {
                    Ok(()) => DispatchOutcome::Handled,
                    Err(e) => {
                        warn!(
                            "Handler for '{}' failed for session {}: {:#}",
                            frame.event, ctx.session_id, e
                        );
                        DispatchOutcome::Failed
                    }
                }
            }
        };

        let label = if outcome == DispatchOutcome::UnknownEvent {
            ""
        } else {
            frame.event.as_str()
        };
        metrics::record_ws_inbound_event(label, outcome.as_str());
        outcome
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
