use axum::extract::FromRef;

use crate::user::UserStore;
use std::sync::Arc;
use std::time::Instant;

use super::websocket::{EventDispatcher, Hub};
use super::ServerConfig;

pub type GuardedUserStore = Arc<dyn UserStore>;

/// Everything a websocket connection needs to be served.
#[derive(Clone)]
pub struct RealtimeState {
    pub hub: Hub,
    pub dispatcher: Arc<EventDispatcher>,
    pub queue_capacity: usize,
}

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub user_store: GuardedUserStore,
    pub realtime: RealtimeState,
}

impl FromRef<ServerState> for GuardedUserStore {
    fn from_ref(input: &ServerState) -> Self {
        input.user_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for RealtimeState {
    fn from_ref(input: &ServerState) -> Self {
        input.realtime.clone()
    }
}

impl FromRef<ServerState> for Hub {
    fn from_ref(input: &ServerState) -> Self {
        input.realtime.hub.clone()
    }
}
