//! Beenzer Server Library
//!
//! Real-time websocket hub and user service for the Beenzer backend.
//! The modules are exposed for the binary and the end-to-end tests.

pub mod config;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use server::{run_server, RequestsLoggingLevel};
pub use user::{SqliteUserStore, UserStore};
