//! WebSocket infrastructure for real-time communication.
//!
//! A [`Hub`] tracks every live session. Each connection gets a [`Session`]
//! with a bounded outbound queue and two pumps: one writing queued frames to
//! the socket, one reading frames and routing them through the
//! [`EventDispatcher`].

pub mod dispatcher;
pub mod events;
pub mod handler;
pub mod hub;
pub mod messages;
pub mod pump;
pub mod session;
pub mod transport;

pub use dispatcher::{DispatchOutcome, EventContext, EventDispatcher, EventHandler};
pub use hub::{BroadcastReport, Hub, HubError, SendError};
pub use session::{Session, SessionId};
