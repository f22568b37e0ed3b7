use super::user_models::{User, UserField, UserLog, UserSummary};
use super::user_store::{parse_field, UserStore, UserStoreError, LOGS_LIMIT, SEARCH_LIMIT};
use crate::sqlite_column;
use crate::sqlite_persistence::{self, Column, SqlType, Table, VersionedSchema};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

const EMPTY: Option<&str> = Some("''");
const ZERO: Option<&str> = Some("0");

/// V 0
const USERS_TABLE_V_0: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("pubkey", &SqlType::Text, is_primary_key = true),
        sqlite_column!("username", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("pfp", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("name", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("lastname", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("description", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("birthdate", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("country", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("flag", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("city", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("phone", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("email", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("verified", &SqlType::Integer, non_null = true, default_value = ZERO),
        sqlite_column!("twitter", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("instagram", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("discord", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("telegram", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("youtube", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("tiktok", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("magiceden", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("opensea", &SqlType::Text, non_null = true, default_value = EMPTY),
        sqlite_column!("appuser", &SqlType::Integer, non_null = true, default_value = ZERO),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("timestamp", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

const FRIENDS_TABLE_V_0: Table = Table {
    name: "friends",
    columns: &[
        sqlite_column!("pubkey", &SqlType::Text, non_null = true),
        sqlite_column!("friend_pubkey", &SqlType::Text, non_null = true),
        sqlite_column!("timestamp", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["pubkey", "friend_pubkey"]],
};

/// V 1
const USER_LOGS_TABLE_V_1: Table = Table {
    name: "user_logs",
    columns: &[
        sqlite_column!("pubkey", &SqlType::Text, non_null = true),
        sqlite_column!("log", &SqlType::Text, non_null = true),
        sqlite_column!("timestamp", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_user_logs_pubkey", "pubkey")],
    unique_constraints: &[],
};

fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
    USER_LOGS_TABLE_V_1.create(conn)
}

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[USERS_TABLE_V_0, FRIENDS_TABLE_V_0],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[USERS_TABLE_V_0, FRIENDS_TABLE_V_0, USER_LOGS_TABLE_V_1],
        migration: Some(migrate_v0_to_v1),
    },
];

const USER_COLUMNS: &str = "pubkey, username, pfp, name, lastname, description, birthdate, \
    country, flag, city, phone, email, verified, twitter, instagram, discord, telegram, \
    youtube, tiktok, magiceden, opensea, appuser, created_at, timestamp";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        pubkey: row.get(0)?,
        username: row.get(1)?,
        pfp: row.get(2)?,
        name: row.get(3)?,
        lastname: row.get(4)?,
        description: row.get(5)?,
        birthdate: row.get(6)?,
        country: row.get(7)?,
        flag: row.get(8)?,
        city: row.get(9)?,
        phone: row.get(10)?,
        email: row.get(11)?,
        verified: row.get::<_, i64>(12)? != 0,
        twitter: row.get(13)?,
        instagram: row.get(14)?,
        discord: row.get(15)?,
        telegram: row.get(16)?,
        youtube: row.get(17)?,
        tiktok: row.get(18)?,
        magiceden: row.get(19)?,
        opensea: row.get(20)?,
        appuser: row.get::<_, i64>(21)? != 0,
        created_at: row.get(22)?,
        timestamp: row.get(23)?,
    })
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Escape LIKE wildcards so the query is matched literally.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let db_path = db_path.as_ref();
        let mut conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open user db at {:?}", db_path))?;
        sqlite_persistence::initialize(&mut conn, VERSIONED_SCHEMAS, "user")?;
        info!("User db ready at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn query_user(conn: &Connection, pubkey: &str) -> Result<Option<User>> {
        conn.query_row(
            &format!("SELECT {} FROM users WHERE pubkey = ?1", USER_COLUMNS),
            params![pubkey],
            user_from_row,
        )
        .optional()
        .with_context(|| format!("Failed to read user {}", pubkey))
    }

    fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            params![username],
            |row| row.get(0),
        )
        .with_context(|| format!("Failed to check username {}", username))
    }
}

impl UserStore for SqliteUserStore {
    fn get_user(&self, pubkey: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        Self::query_user(&conn, pubkey)
    }

    fn create_user(&self, pubkey: &str, username: &str, appuser: bool) -> Result<()> {
        let conn = self.conn.lock();
        if Self::username_exists(&conn, username)? {
            return Err(UserStoreError::UsernameTaken(username.to_string()).into());
        }
        if Self::query_user(&conn, pubkey)?.is_some() {
            return Err(UserStoreError::UserExists(pubkey.to_string()).into());
        }
        let now = now_millis();
        conn.execute(
            "INSERT INTO users (pubkey, username, appuser, created_at, timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![pubkey, username, appuser as i64, now],
        )
        .with_context(|| format!("Failed to create user {}", pubkey))?;
        debug!("Created user {} ({})", pubkey, username);
        Ok(())
    }

    fn update_user(&self, pubkey: &str, field: &str, value: &str) -> Result<()> {
        let field = parse_field(field)?;
        let conn = self.conn.lock();

        if field == UserField::Username && Self::username_exists(&conn, value)? {
            let owner: Option<String> = conn
                .query_row(
                    "SELECT pubkey FROM users WHERE username = ?1",
                    params![value],
                    |row| row.get(0),
                )
                .optional()?;
            if owner.as_deref() != Some(pubkey) {
                return Err(UserStoreError::UsernameTaken(value.to_string()).into());
            }
        }

        let sql = format!(
            "UPDATE users SET {} = ?1, timestamp = ?2 WHERE pubkey = ?3",
            field.column()
        );
        let result = if field == UserField::Verified {
            let verified = matches!(value, "true" | "1");
            conn.execute(&sql, params![verified as i64, now_millis(), pubkey])
        } else {
            conn.execute(&sql, params![value, now_millis(), pubkey])
        };
        let updated = result
            .with_context(|| format!("Failed to update {} of user {}", field.wire_name(), pubkey))?;

        if updated == 0 {
            return Err(UserStoreError::UserNotFound(pubkey.to_string()).into());
        }
        Ok(())
    }

    fn is_new_user(&self, pubkey: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE pubkey = ?1)",
                params![pubkey],
                |row| row.get(0),
            )
            .with_context(|| format!("Failed to check user {}", pubkey))?;
        Ok(!exists)
    }

    fn is_username_taken(&self, username: &str) -> Result<bool> {
        let conn = self.conn.lock();
        Self::username_exists(&conn, username)
    }

    fn search_users(&self, query: &str) -> Result<Vec<UserSummary>> {
        let conn = self.conn.lock();
        let pattern = format!("%{}%", escape_like(query));
        let mut stmt = conn.prepare(
            "SELECT pubkey, username, pfp, verified FROM users \
             WHERE username LIKE ?1 ESCAPE '\\' \
             ORDER BY username LIMIT ?2",
        )?;
        let users = stmt
            .query_map(params![pattern, SEARCH_LIMIT as i64], |row| {
                Ok(UserSummary {
                    pubkey: row.get(0)?,
                    username: row.get(1)?,
                    pfp: row.get(2)?,
                    verified: row.get::<_, i64>(3)? != 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to search users for '{}'", query))?;
        Ok(users)
    }

    fn add_friend(&self, pubkey: &str, friend: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO friends (pubkey, friend_pubkey, timestamp) VALUES (?1, ?2, ?3)",
            params![pubkey, friend, now_millis()],
        )
        .with_context(|| format!("Failed to add friend {} to {}", friend, pubkey))?;
        Ok(())
    }

    fn remove_friend(&self, pubkey: &str, friend: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM friends WHERE pubkey = ?1 AND friend_pubkey = ?2",
            params![pubkey, friend],
        )
        .with_context(|| format!("Failed to remove friend {} from {}", friend, pubkey))?;
        Ok(())
    }

    fn is_friend(&self, pubkey: &str, friend: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM friends WHERE pubkey = ?1 AND friend_pubkey = ?2)",
            params![pubkey, friend],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn get_user_friends(&self, pubkey: &str) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT friend_pubkey FROM friends WHERE pubkey = ?1 ORDER BY timestamp",
        )?;
        let friend_keys = stmt
            .query_map(params![pubkey], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut friends = Vec::with_capacity(friend_keys.len());
        for key in friend_keys {
            match Self::query_user(&conn, &key)? {
                Some(user) => friends.push(user),
                None => debug!("Friend {} of {} has no profile, skipping", key, pubkey),
            }
        }
        Ok(friends)
    }

    fn add_log(&self, pubkey: &str, log: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO user_logs (pubkey, log, timestamp) VALUES (?1, ?2, ?3)",
            params![pubkey, log, now_millis()],
        )
        .with_context(|| format!("Failed to add log for {}", pubkey))?;
        Ok(())
    }

    fn get_logs(&self, pubkey: &str) -> Result<Vec<UserLog>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT pubkey, log, timestamp FROM user_logs WHERE pubkey = ?1 \
             ORDER BY timestamp DESC, rowid DESC LIMIT ?2",
        )?;
        let logs = stmt
            .query_map(params![pubkey, LOGS_LIMIT as i64], |row| {
                Ok(UserLog {
                    pubkey: row.get(0)?,
                    log: row.get(1)?,
                    timestamp: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }
}
