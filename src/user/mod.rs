mod sqlite_user_store;
pub mod user_models;
mod user_store;
pub mod validation;

pub use sqlite_user_store::SqliteUserStore;
pub use user_models::{User, UserField, UserLog, UserSummary};
pub use user_store::{UserStore, UserStoreError, LOGS_LIMIT, SEARCH_LIMIT};
