//! REST endpoints for user profiles, friendships and activity logs.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::state::{GuardedUserStore, ServerState};
use crate::user::{
    validation::{
        are_valid_friend_keys, is_valid_pubkey, is_valid_username, prepare_field_value,
        sql_filter, MIN_SEARCH_QUERY_LEN,
    },
    UserField, UserStoreError,
};

#[derive(Deserialize, Debug)]
struct CreateUserBody {
    pub pubkey: String,
    pub username: String,
    #[serde(default)]
    pub appuser: bool,
}

#[derive(Deserialize, Debug)]
struct UpdateUserBody {
    pub field: String,
    pub value: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn success() -> Response {
    Json(json!({ "success": true })).into_response()
}

/// Rejections carried by the store map to client errors, anything else is a 500.
fn store_error_response(err: anyhow::Error) -> Response {
    match err.downcast_ref::<UserStoreError>() {
        Some(UserStoreError::UserNotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, err.to_string())
        }
        Some(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        None => {
            error!("User store failure: {:#}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

async fn create_user(
    State(store): State<GuardedUserStore>,
    Json(body): Json<CreateUserBody>,
) -> Response {
    if !is_valid_pubkey(&body.pubkey) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid public key");
    }
    let username = sql_filter(&body.username);
    if !is_valid_username(&username) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Username must be at least 3 characters",
        );
    }

    match store.create_user(&body.pubkey, &username, body.appuser) {
        Ok(()) => {
            info!("Created user {} ({})", username, body.pubkey);
            if let Err(e) = store.add_log(&body.pubkey, "created account") {
                error!("Failed to record activity for {}: {:#}", body.pubkey, e);
            }
            (StatusCode::CREATED, Json(json!({ "success": true }))).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

async fn get_user(State(store): State<GuardedUserStore>, Path(pubkey): Path<String>) -> Response {
    match store.get_user(&pubkey) {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => store_error_response(e),
    }
}

async fn update_user(
    State(store): State<GuardedUserStore>,
    Path(pubkey): Path<String>,
    Json(body): Json<UpdateUserBody>,
) -> Response {
    let Some(field) = UserField::from_wire_name(&body.field) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid field: {}", body.field),
        );
    };
    let Some(value) = prepare_field_value(field, &body.value) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid value");
    };

    match store.update_user(&pubkey, field.wire_name(), &value) {
        Ok(()) => {
            if let Err(e) = store.add_log(&pubkey, &format!("updated {}", field.wire_name())) {
                error!("Failed to record activity for {}: {:#}", pubkey, e);
            }
            success()
        }
        Err(e) => store_error_response(e),
    }
}

async fn search_users(
    State(store): State<GuardedUserStore>,
    Path(query): Path<String>,
) -> Response {
    let query = sql_filter(&query);
    if query.chars().count() < MIN_SEARCH_QUERY_LEN {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Search query must be at least 3 characters",
        );
    }
    match store.search_users(&query) {
        Ok(users) => Json(users).into_response(),
        Err(e) => store_error_response(e),
    }
}

async fn check_username(
    State(store): State<GuardedUserStore>,
    Path(username): Path<String>,
) -> Response {
    match store.is_username_taken(&sql_filter(&username)) {
        Ok(taken) => Json(json!({ "available": !taken })).into_response(),
        Err(e) => store_error_response(e),
    }
}

async fn is_new_user(State(store): State<GuardedUserStore>, Path(pubkey): Path<String>) -> Response {
    match store.is_new_user(&pubkey) {
        Ok(is_new) => Json(json!({ "isNew": is_new })).into_response(),
        Err(e) => store_error_response(e),
    }
}

async fn add_friend(
    State(store): State<GuardedUserStore>,
    Path((pubkey, friend)): Path<(String, String)>,
) -> Response {
    if !are_valid_friend_keys(&pubkey, &friend) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid public key");
    }
    match store.add_friend(&pubkey, &friend) {
        Ok(()) => success(),
        Err(e) => store_error_response(e),
    }
}

async fn remove_friend(
    State(store): State<GuardedUserStore>,
    Path((pubkey, friend)): Path<(String, String)>,
) -> Response {
    match store.remove_friend(&pubkey, &friend) {
        Ok(()) => success(),
        Err(e) => store_error_response(e),
    }
}

async fn get_user_friends(
    State(store): State<GuardedUserStore>,
    Path(pubkey): Path<String>,
) -> Response {
    match store.get_user_friends(&pubkey) {
        Ok(friends) => Json(friends).into_response(),
        Err(e) => store_error_response(e),
    }
}

async fn get_user_logs(
    State(store): State<GuardedUserStore>,
    Path(pubkey): Path<String>,
) -> Response {
    match store.get_logs(&pubkey) {
        Ok(logs) => Json(logs).into_response(),
        Err(e) => store_error_response(e),
    }
}

pub fn make_user_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", post(create_user))
        .route("/search/{query}", get(search_users))
        .route("/check/{username}", get(check_username))
        .route("/{pubkey}", get(get_user).put(update_user))
        .route("/{pubkey}/new", get(is_new_user))
        .route("/{pubkey}/friends", get(get_user_friends))
        .route(
            "/{pubkey}/friends/{friend}",
            post(add_friend).delete(remove_friend),
        )
        .route("/{pubkey}/logs", get(get_user_logs))
        .with_state(state)
}
