use anyhow::{Context, Result};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::{
    log_requests, metrics,
    state::*,
    user_routes::make_user_routes,
    websocket::{events::register_user_events, handler::ws_handler, EventDispatcher, Hub},
    ServerConfig,
};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub connected_sessions: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        connected_sessions: state.realtime.hub.connected_count(),
    };
    Json(stats)
}

/// Spawn the hub and build the dispatch table for user events.
/// Must run inside a tokio runtime.
pub fn make_realtime(
    user_store: GuardedUserStore,
    hub_channel_capacity: usize,
    queue_capacity: usize,
) -> RealtimeState {
    let mut dispatcher = EventDispatcher::new();
    register_user_events(&mut dispatcher, user_store);
    info!(
        "Registered websocket events: {}",
        dispatcher.events().join(", ")
    );

    RealtimeState {
        hub: Hub::spawn(hub_channel_capacity),
        dispatcher: Arc::new(dispatcher),
        queue_capacity,
    }
}

pub fn make_app(
    config: ServerConfig,
    user_store: GuardedUserStore,
    realtime: RealtimeState,
) -> Result<Router> {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        hash: env!("GIT_HASH").to_owned(),
        user_store,
        realtime,
    };

    let home_router: Router = Router::new()
        .route("/", get(home))
        .route("/health", get(home))
        .route("/ws", get(ws_handler))
        .with_state(state.clone());

    let app: Router = home_router
        .nest("/api/users", make_user_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    user_store: GuardedUserStore,
    hub_channel_capacity: usize,
    shutdown: CancellationToken,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let realtime = make_realtime(
        user_store.clone(),
        hub_channel_capacity,
        config.outbound_queue_capacity,
    );
    let app = make_app(config, user_store, realtime)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    let metrics_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let result = axum::serve(metrics_listener, make_metrics_app())
            .with_graceful_shutdown(async move { metrics_shutdown.cancelled().await })
            .await;
        if let Err(e) = result {
            error!("Metrics server failed: {}", e);
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("HTTP server stopped");
    Ok(())
}
