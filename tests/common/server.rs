//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own user database.

use super::constants::*;
use beenzer_server::server::server::{make_app, make_realtime};
use beenzer_server::server::state::GuardedUserStore;
use beenzer_server::server::websocket::Hub;
use beenzer_server::server::{RequestsLoggingLevel, ServerConfig};
use beenzer_server::user::SqliteUserStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated database
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// User store for direct database access in tests
    pub user_store: GuardedUserStore,

    /// Handle on the running hub, for checking registrations
    pub hub: Hub,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the database cannot be created, the port cannot be bound,
    /// or the server doesn't become ready within the timeout.
    pub async fn spawn() -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let user_store: GuardedUserStore = Arc::new(
            SqliteUserStore::new(temp_db_dir.path().join("users.db"))
                .expect("Failed to open user store"),
        );

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            outbound_queue_capacity: TEST_QUEUE_CAPACITY,
            ..Default::default()
        };
        let realtime = make_realtime(user_store.clone(), 64, TEST_QUEUE_CAPACITY);
        let hub = realtime.hub.clone();
        let app = make_app(config, user_store.clone(), realtime).expect("Failed to build app");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            user_store,
            hub,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Polls until the hub reports `expected` connected sessions.
    pub async fn wait_for_sessions(&self, expected: usize) {
        let start = std::time::Instant::now();
        while self.hub.connected_count() != expected {
            if start.elapsed() > Duration::from_millis(WS_FRAME_TIMEOUT_MS) {
                panic!(
                    "Expected {} sessions, hub has {}",
                    expected,
                    self.hub.connected_count()
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Waits for the server to become ready by polling the / endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
