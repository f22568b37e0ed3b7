//! Shared constants for end-to-end tests

// ============================================================================
// Test Users
// ============================================================================

/// Valid base58 public keys
pub const ALICE_PUBKEY: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";
pub const BOB_PUBKEY: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";

pub const ALICE_USERNAME: &str = "alice";
pub const BOB_USERNAME: &str = "bobby";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness polls
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Timeout for individual HTTP requests
pub const REQUEST_TIMEOUT_SECS: u64 = 5;

/// How long to wait for an expected websocket frame
pub const WS_FRAME_TIMEOUT_MS: u64 = 2000;

/// How long to wait before concluding that no frame is coming
pub const WS_SILENCE_MS: u64 = 200;

/// Outbound queue capacity used by the test server
pub const TEST_QUEUE_CAPACITY: usize = 32;
