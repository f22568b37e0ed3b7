//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, WsClient};
//!
//! #[tokio::test]
//! async fn test_welcome() {
//!     let server = TestServer::spawn().await;
//!     let mut ws = WsClient::connect(&server.ws_url()).await;
//!
//!     let frame = ws.next_frame().await;
//!     assert_eq!(frame["event"], "serverConnection");
//! }
//! ```

mod client;
mod constants;
mod server;

// Public API - this is what tests import
pub use client::{TestClient, WsClient};
pub use constants::*;
pub use server::TestServer;
