//! User events served over the websocket.
//!
//! Every handler answers the requesting session with a direct send.
//! `newUser` additionally announces the new account to every session.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    dispatcher::{EventContext, EventDispatcher, EventHandler},
    messages::{client_events, server_events, ErrorPayload},
};
use crate::user::{
    validation::{
        are_valid_friend_keys, is_valid_pubkey, is_valid_username, prepare_field_value,
        sql_filter, MIN_SEARCH_QUERY_LEN,
    },
    UserField, UserStore,
};

pub type SharedUserStore = Arc<dyn UserStore>;

#[derive(Deserialize)]
struct PubkeyPayload {
    pubkey: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct NewConnectionPayload {
    pubkey: Option<String>,
}

#[derive(Deserialize)]
struct NewUserPayload {
    pubkey: String,
    username: String,
    #[serde(default)]
    appuser: bool,
}

#[derive(Deserialize)]
struct UpdateUserPayload {
    pubkey: String,
    field: String,
    value: String,
}

#[derive(Deserialize)]
struct SearchPayload {
    query: String,
}

#[derive(Deserialize)]
struct FriendPayload {
    pubkey: String,
    friend: String,
}

#[derive(Serialize)]
struct UserJoined<'a> {
    pubkey: &'a str,
    username: &'a str,
}

/// Decode `data` into `T`. On failure the session gets an `error` frame
/// and `None` is returned.
fn decode<T: DeserializeOwned>(ctx: &EventContext, event: &str, data: Value) -> Option<T> {
    let data = if data.is_null() {
        Value::Object(Default::default())
    } else {
        data
    };
    match serde_json::from_value(data) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(
                "Invalid '{}' payload from session {}: {}",
                event, ctx.session_id, e
            );
            let error = ErrorPayload::new("invalid_payload", format!("{}: {}", event, e));
            ctx.reply(server_events::ERROR, &error);
            None
        }
    }
}

fn log_activity(store: &SharedUserStore, pubkey: &str, log: &str) {
    if let Err(e) = store.add_log(pubkey, log) {
        warn!("Failed to record activity for {}: {:#}", pubkey, e);
    }
}

struct NewConnection {
    store: SharedUserStore,
}

#[async_trait]
impl EventHandler for NewConnection {
    async fn handle(&self, ctx: &EventContext, data: Value) -> anyhow::Result<()> {
        let Some(payload) =
            decode::<NewConnectionPayload>(ctx, client_events::NEW_CONNECTION, data)
        else {
            return Ok(());
        };
        let is_new = match payload.pubkey.as_deref() {
            None | Some("") => true,
            Some(pubkey) => self.store.is_new_user(pubkey)?,
        };
        ctx.reply(server_events::IS_NEW_USER, &is_new);
        Ok(())
    }
}

struct NewUser {
    store: SharedUserStore,
}

#[async_trait]
impl EventHandler for NewUser {
    async fn handle(&self, ctx: &EventContext, data: Value) -> anyhow::Result<()> {
        let Some(payload) = decode::<NewUserPayload>(ctx, client_events::NEW_USER, data) else {
            return Ok(());
        };
        if !is_valid_pubkey(&payload.pubkey) {
            debug!("Rejected public key '{}'", payload.pubkey);
            ctx.reply(server_events::NEW_USER_CREATED, &false);
            return Ok(());
        }
        let username = sql_filter(&payload.username);
        if !is_valid_username(&username) {
            debug!("Rejected username '{}'", payload.username);
            ctx.reply(server_events::NEW_USER_CREATED, &false);
            return Ok(());
        }

        if let Err(e) = self
            .store
            .create_user(&payload.pubkey, &username, payload.appuser)
        {
            info!("Could not create user {}: {:#}", payload.pubkey, e);
            ctx.reply(server_events::NEW_USER_CREATED, &false);
            return Ok(());
        }
        log_activity(&self.store, &payload.pubkey, "created account");
        ctx.reply(server_events::NEW_USER_CREATED, &true);

        let joined = UserJoined {
            pubkey: &payload.pubkey,
            username: &username,
        };
        let report = ctx.hub.broadcast(server_events::USER_JOINED, &joined).await?;
        debug!(
            "Announced {} to {} of {} sessions",
            username, report.delivered, report.recipients
        );
        Ok(())
    }
}

struct GetUser {
    store: SharedUserStore,
}

#[async_trait]
impl EventHandler for GetUser {
    async fn handle(&self, ctx: &EventContext, data: Value) -> anyhow::Result<()> {
        let Some(payload) = decode::<PubkeyPayload>(ctx, client_events::GET_USER, data) else {
            return Ok(());
        };
        let user = self.store.get_user(&payload.pubkey)?;
        ctx.reply(server_events::USER_INFO, &user);
        Ok(())
    }
}

struct UpdateUser {
    store: SharedUserStore,
}

impl UpdateUser {
    fn apply(&self, payload: &UpdateUserPayload) -> anyhow::Result<bool> {
        let Some(field) = UserField::from_wire_name(&payload.field) else {
            return Ok(false);
        };
        let Some(value) = prepare_field_value(field, &payload.value) else {
            return Ok(false);
        };
        self.store
            .update_user(&payload.pubkey, field.wire_name(), &value)?;
        log_activity(
            &self.store,
            &payload.pubkey,
            &format!("updated {}", field.wire_name()),
        );
        Ok(true)
    }
}

#[async_trait]
impl EventHandler for UpdateUser {
    async fn handle(&self, ctx: &EventContext, data: Value) -> anyhow::Result<()> {
        let Some(payload) = decode::<UpdateUserPayload>(ctx, client_events::UPDATE_USER, data)
        else {
            return Ok(());
        };
        let updated = match self.apply(&payload) {
            Ok(updated) => updated,
            Err(e) => {
                info!("Update of {} for {} failed: {:#}", payload.field, payload.pubkey, e);
                false
            }
        };
        ctx.reply(server_events::USER_UPDATED, &updated);
        Ok(())
    }
}

struct SearchUsers {
    store: SharedUserStore,
}

#[async_trait]
impl EventHandler for SearchUsers {
    async fn handle(&self, ctx: &EventContext, data: Value) -> anyhow::Result<()> {
        let Some(payload) = decode::<SearchPayload>(ctx, client_events::SEARCH_USERS, data) else {
            return Ok(());
        };
        let query = sql_filter(&payload.query);
        let results = if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            Vec::new()
        } else {
            self.store.search_users(&query)?
        };
        ctx.reply(server_events::SEARCH_USERS_RESULT, &results);
        Ok(())
    }
}

struct AddFriend {
    store: SharedUserStore,
}

#[async_trait]
impl EventHandler for AddFriend {
    async fn handle(&self, ctx: &EventContext, data: Value) -> anyhow::Result<()> {
        let Some(payload) = decode::<FriendPayload>(ctx, client_events::ADD_FRIEND, data) else {
            return Ok(());
        };
        let added = are_valid_friend_keys(&payload.pubkey, &payload.friend)
            && self.store.add_friend(&payload.pubkey, &payload.friend).is_ok();
        ctx.reply(server_events::FRIEND_ADDED, &added);
        Ok(())
    }
}

struct DeleteFriend {
    store: SharedUserStore,
}

#[async_trait]
impl EventHandler for DeleteFriend {
    async fn handle(&self, ctx: &EventContext, data: Value) -> anyhow::Result<()> {
        let Some(payload) = decode::<FriendPayload>(ctx, client_events::DELETE_FRIEND, data)
        else {
            return Ok(());
        };
        let deleted = match self.store.remove_friend(&payload.pubkey, &payload.friend) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to remove friend for {}: {:#}", payload.pubkey, e);
                false
            }
        };
        ctx.reply(server_events::FRIEND_DELETED, &deleted);
        Ok(())
    }
}

struct GetUserFriends {
    store: SharedUserStore,
}

#[async_trait]
impl EventHandler for GetUserFriends {
    async fn handle(&self, ctx: &EventContext, data: Value) -> anyhow::Result<()> {
        let Some(payload) = decode::<PubkeyPayload>(ctx, client_events::GET_USER_FRIENDS, data)
        else {
            return Ok(());
        };
        let friends = self.store.get_user_friends(&payload.pubkey)?;
        ctx.reply(server_events::USER_FRIENDS, &friends);
        Ok(())
    }
}

/// Install the user event handlers into `dispatcher`.
pub fn register_user_events(dispatcher: &mut EventDispatcher, store: SharedUserStore) {
    dispatcher.register(
        client_events::NEW_CONNECTION,
        NewConnection {
            store: store.clone(),
        },
    );
    dispatcher.register(
        client_events::NEW_USER,
        NewUser {
            store: store.clone(),
        },
    );
    dispatcher.register(
        client_events::GET_USER,
        GetUser {
            store: store.clone(),
        },
    );
    dispatcher.register(
        client_events::UPDATE_USER,
        UpdateUser {
            store: store.clone(),
        },
    );
    dispatcher.register(
        client_events::SEARCH_USERS,
        SearchUsers {
            store: store.clone(),
        },
    );
    dispatcher.register(
        client_events::ADD_FRIEND,
        AddFriend {
            store: store.clone(),
        },
    );
    dispatcher.register(
        client_events::DELETE_FRIEND,
        DeleteFriend {
            store: store.clone(),
        },
    );
    dispatcher.register(client_events::GET_USER_FRIENDS, GetUserFriends { store });
}
