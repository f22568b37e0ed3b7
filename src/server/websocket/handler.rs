//! WebSocket route handler.
//!
//! Upgrades the connection and hands both halves to the session pumps.

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use futures::StreamExt;
use tracing::debug;

use super::pump::serve_session;
use crate::server::state::RealtimeState;

/// WebSocket upgrade handler for `GET /ws`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(realtime): State<RealtimeState>) -> Response {
    debug!("WebSocket upgrade requested");
    ws.on_upgrade(move |socket| {
        let (sink, stream) = socket.split();
        serve_session(
            realtime.hub,
            realtime.dispatcher,
            realtime.queue_capacity,
            stream,
            sink,
        )
    })
}
