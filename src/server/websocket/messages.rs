//! WebSocket message types.
//!
//! Every frame, in both directions, is a JSON object of the form
//! `{"event": <string>, "data": <any JSON value>}`.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Client -> Server frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    /// Event name, used to look up the handler.
    pub event: String,
    /// Event payload. Missing `data` is treated as `null`.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Borrowed view used when serializing outgoing frames, so the payload
/// does not need to be converted into a `serde_json::Value` first.
#[derive(Serialize)]
struct OutgoingFrame<'a, T: Serialize + ?Sized> {
    event: &'a str,
    data: &'a T,
}

/// A frame that has already been turned into its wire representation.
///
/// Cloning is cheap, which lets a broadcast serialize once and hand the
/// same bytes to every session queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedFrame(Arc<str>);

impl SerializedFrame {
    /// Serialize `data` under `event`.
    pub fn encode<T: Serialize + ?Sized>(event: &str, data: &T) -> serde_json::Result<Self> {
        let text = serde_json::to_string(&OutgoingFrame { event, data })?;
        Ok(Self(text.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SerializedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event names sent by the server.
pub mod server_events {
    /// Acknowledgement sent to a session right after it is registered.
    pub const SERVER_CONNECTION: &str = "serverConnection";
    /// Current number of connected sessions, sent right after registration.
    pub const N_USERS: &str = "nUsers";
    pub const ERROR: &str = "error";

    pub const IS_NEW_USER: &str = "isNewUser";
    pub const NEW_USER_CREATED: &str = "newUserCreated";
    pub const USER_JOINED: &str = "userJoined";
    pub const USER_INFO: &str = "userInfo";
    pub const USER_UPDATED: &str = "userUpdated";
    pub const SEARCH_USERS_RESULT: &str = "searchUsersResult";
    pub const FRIEND_ADDED: &str = "friendAdded";
    pub const FRIEND_DELETED: &str = "friendDeleted";
    pub const USER_FRIENDS: &str = "userFriends";
}

/// Event names accepted from clients.
pub mod client_events {
    pub const NEW_CONNECTION: &str = "newConnection";
    pub const NEW_USER: &str = "newUser";
    pub const GET_USER: &str = "getUser";
    pub const UPDATE_USER: &str = "updateUser";
    pub const SEARCH_USERS: &str = "searchUsers";
    pub const ADD_FRIEND: &str = "addFriend";
    pub const DELETE_FRIEND: &str = "deleteFriend";
    pub const GET_USER_FRIENDS: &str = "getUserFriends";
}

/// Text of the `serverConnection` acknowledgement.
pub const SERVER_CONNECTION_TEXT: &str = "Client connected to server successfully";

/// Payload of the `error` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
