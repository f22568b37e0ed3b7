use super::user_models::{User, UserField, UserLog, UserSummary};
use anyhow::Result;
use thiserror::Error;

/// Maximum number of users returned by a search.
pub const SEARCH_LIMIT: usize = 50;
/// Maximum number of log entries returned for a user.
pub const LOGS_LIMIT: usize = 100;

/// Rejections the store reports as values rather than database failures.
/// They travel inside `anyhow::Error` and can be recovered with `downcast_ref`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserStoreError {
    #[error("invalid field: {0}")]
    InvalidField(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("username already exists: {0}")]
    UsernameTaken(String),
    #[error("user already exists: {0}")]
    UserExists(String),
}

pub trait UserStore: Send + Sync {
    /// Returns the user with the given public key.
    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, pubkey: &str) -> Result<Option<User>>;

    /// Creates a new user.
    /// Fails with `UserStoreError::UsernameTaken` or `UserStoreError::UserExists`
    /// on conflicts.
    fn create_user(&self, pubkey: &str, username: &str, appuser: bool) -> Result<()>;

    /// Sets one profile field and bumps the user's timestamp.
    /// `field` is the wire name of the field, see [`UserField`].
    fn update_user(&self, pubkey: &str, field: &str, value: &str) -> Result<()>;

    /// True if no user with this public key exists.
    fn is_new_user(&self, pubkey: &str) -> Result<bool>;

    fn is_username_taken(&self, username: &str) -> Result<bool>;

    /// Case-insensitive substring match on usernames, ordered by username,
    /// at most [`SEARCH_LIMIT`] results.
    fn search_users(&self, query: &str) -> Result<Vec<UserSummary>>;

    /// Adding an existing friendship is not an error.
    fn add_friend(&self, pubkey: &str, friend: &str) -> Result<()>;

    /// Removing a missing friendship is not an error.
    fn remove_friend(&self, pubkey: &str, friend: &str) -> Result<()>;

    fn is_friend(&self, pubkey: &str, friend: &str) -> Result<bool>;

    /// Profiles of the user's friends. Friends without a profile are skipped.
    fn get_user_friends(&self, pubkey: &str) -> Result<Vec<User>>;

    fn add_log(&self, pubkey: &str, log: &str) -> Result<()>;

    /// Newest first, at most [`LOGS_LIMIT`] entries.
    fn get_logs(&self, pubkey: &str) -> Result<Vec<UserLog>>;
}

/// Resolve a wire field name or fail with `UserStoreError::InvalidField`.
pub fn parse_field(field: &str) -> Result<UserField> {
    UserField::from_wire_name(field)
        .ok_or_else(|| UserStoreError::InvalidField(field.to_string()).into())
}
