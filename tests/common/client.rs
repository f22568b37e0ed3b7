//! Clients for end-to-end tests
//!
//! `TestClient` wraps reqwest for the REST endpoints, `WsClient` wraps a
//! tokio-tungstenite connection speaking `{event, data}` frames.
//!
//! When API routes or frame formats change, update only this file.

use super::constants::*;
use futures::{SinkExt, StreamExt};
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// HTTP test client
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn home(&self) -> Response {
        self.client
            .get(self.url("/"))
            .send()
            .await
            .expect("Home request failed")
    }

    pub async fn create_user(&self, pubkey: &str, username: &str) -> Response {
        self.client
            .post(self.url("/api/users"))
            .json(&json!({ "pubkey": pubkey, "username": username, "appuser": true }))
            .send()
            .await
            .expect("Create user request failed")
    }

    pub async fn get_user(&self, pubkey: &str) -> Response {
        self.client
            .get(self.url(&format!("/api/users/{}", pubkey)))
            .send()
            .await
            .expect("Get user request failed")
    }

    pub async fn update_user(&self, pubkey: &str, field: &str, value: &str) -> Response {
        self.client
            .put(self.url(&format!("/api/users/{}", pubkey)))
            .json(&json!({ "field": field, "value": value }))
            .send()
            .await
            .expect("Update user request failed")
    }

    pub async fn search_users(&self, query: &str) -> Response {
        self.client
            .get(self.url(&format!("/api/users/search/{}", query)))
            .send()
            .await
            .expect("Search request failed")
    }

    pub async fn check_username(&self, username: &str) -> Response {
        self.client
            .get(self.url(&format!("/api/users/check/{}", username)))
            .send()
            .await
            .expect("Check username request failed")
    }

    pub async fn is_new_user(&self, pubkey: &str) -> Response {
        self.client
            .get(self.url(&format!("/api/users/{}/new", pubkey)))
            .send()
            .await
            .expect("Is new user request failed")
    }

    pub async fn add_friend(&self, pubkey: &str, friend: &str) -> Response {
        self.client
            .post(self.url(&format!("/api/users/{}/friends/{}", pubkey, friend)))
            .send()
            .await
            .expect("Add friend request failed")
    }

    pub async fn remove_friend(&self, pubkey: &str, friend: &str) -> Response {
        self.client
            .delete(self.url(&format!("/api/users/{}/friends/{}", pubkey, friend)))
            .send()
            .await
            .expect("Remove friend request failed")
    }

    pub async fn get_friends(&self, pubkey: &str) -> Response {
        self.client
            .get(self.url(&format!("/api/users/{}/friends", pubkey)))
            .send()
            .await
            .expect("Get friends request failed")
    }

    pub async fn get_logs(&self, pubkey: &str) -> Response {
        self.client
            .get(self.url(&format!("/api/users/{}/logs", pubkey)))
            .send()
            .await
            .expect("Get logs request failed")
    }
}

/// Websocket test client
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(url: &str) -> Self {
        let (stream, _) = connect_async(url)
            .await
            .expect("Failed to connect to WebSocket");
        Self { stream }
    }

    /// Connects and consumes the `serverConnection` and `nUsers` welcome frames.
    /// Returns the client and the announced user count.
    pub async fn connect_welcomed(url: &str) -> (Self, u64) {
        let mut client = Self::connect(url).await;
        let ack = client.next_frame().await;
        assert_eq!(ack["event"], "serverConnection");
        let count = client.next_frame().await;
        assert_eq!(count["event"], "nUsers");
        let n = count["data"].as_u64().expect("nUsers carries a number");
        (client, n)
    }

    pub async fn send_event(&mut self, event: &str, data: Value) {
        self.send_raw(&json!({ "event": event, "data": data }).to_string())
            .await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::text(text))
            .await
            .expect("Failed to send frame");
    }

    /// Next text frame as JSON. Panics on timeout, close, or error.
    pub async fn next_frame(&mut self) -> Value {
        match self.try_next_frame(Duration::from_millis(WS_FRAME_TIMEOUT_MS)).await {
            Some(frame) => frame,
            None => panic!("No frame received within {}ms", WS_FRAME_TIMEOUT_MS),
        }
    }

    /// Next text frame as JSON, or `None` if nothing arrives in `wait`.
    pub async fn try_next_frame(&mut self, wait: Duration) -> Option<Value> {
        let result = timeout(wait, async {
            while let Some(msg) = self.stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        return serde_json::from_str::<Value>(&text).ok();
                    }
                    Ok(Message::Close(_)) | Err(_) => return None,
                    Ok(_) => continue,
                }
            }
            None
        })
        .await;
        result.ok().flatten()
    }

    /// Asserts that no frame arrives for a short while.
    pub async fn expect_silence(&mut self) {
        if let Some(frame) = self
            .try_next_frame(Duration::from_millis(WS_SILENCE_MS))
            .await
        {
            panic!("Expected no frame, got {}", frame);
        }
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
