//! End-to-end tests for the user REST endpoints

mod common;

use common::{TestClient, TestServer, ALICE_PUBKEY, ALICE_USERNAME, BOB_PUBKEY, BOB_USERNAME};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_create_and_get_user() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.create_user(ALICE_PUBKEY, ALICE_USERNAME).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"success": true}));

    let response = client.get_user(ALICE_PUBKEY).await;
    assert_eq!(response.status(), StatusCode::OK);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["__pubkey__"], ALICE_PUBKEY);
    assert_eq!(user["_username_"], ALICE_USERNAME);
    assert_eq!(user["_appuser"], true);
    assert_eq!(user["_verified"], false);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_user(BOB_PUBKEY).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    client.create_user(ALICE_PUBKEY, ALICE_USERNAME).await;
    let response = client.create_user(BOB_PUBKEY, ALICE_USERNAME).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = client
        .check_username(ALICE_USERNAME)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"available": false}));
}

#[tokio::test]
async fn test_update_profile_field() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    client.create_user(ALICE_PUBKEY, ALICE_USERNAME).await;

    let response = client
        .update_user(ALICE_PUBKEY, "_twitter", "alice_on_x")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.update_user(ALICE_PUBKEY, "_balance", "100").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let user: Value = client.get_user(ALICE_PUBKEY).await.json().await.unwrap();
    assert_eq!(user["_twitter"], "alice_on_x");

    let logs: Value = client.get_logs(ALICE_PUBKEY).await.json().await.unwrap();
    assert_eq!(logs[0]["_logs"], "updated _twitter");
    assert_eq!(logs[1]["_logs"], "created account");
}

#[tokio::test]
async fn test_search_and_new_user_checks() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    client.create_user(ALICE_PUBKEY, ALICE_USERNAME).await;
    client.create_user(BOB_PUBKEY, BOB_USERNAME).await;

    let response = client.search_users("ob").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let results: Value = client.search_users("BOB").await.json().await.unwrap();
    assert_eq!(
        results,
        json!([{
            "__pubkey__": BOB_PUBKEY,
            "_username_": BOB_USERNAME,
            "_pfp": "",
            "_verified": false
        }])
    );

    let body: Value = client.is_new_user(ALICE_PUBKEY).await.json().await.unwrap();
    assert_eq!(body, json!({"isNew": false}));
}

#[tokio::test]
async fn test_friend_lifecycle() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    client.create_user(ALICE_PUBKEY, ALICE_USERNAME).await;
    client.create_user(BOB_PUBKEY, BOB_USERNAME).await;

    let response = client.add_friend(ALICE_PUBKEY, BOB_PUBKEY).await;
    assert_eq!(response.status(), StatusCode::OK);
    // Adding twice is fine
    let response = client.add_friend(ALICE_PUBKEY, BOB_PUBKEY).await;
    assert_eq!(response.status(), StatusCode::OK);

    let friends: Value = client.get_friends(ALICE_PUBKEY).await.json().await.unwrap();
    assert_eq!(friends.as_array().unwrap().len(), 1);
    assert_eq!(friends[0]["_username_"], BOB_USERNAME);

    let response = client.remove_friend(ALICE_PUBKEY, BOB_PUBKEY).await;
    assert_eq!(response.status(), StatusCode::OK);
    let friends: Value = client.get_friends(ALICE_PUBKEY).await.json().await.unwrap();
    assert_eq!(friends, json!([]));

    let response = client.add_friend(ALICE_PUBKEY, "tooshort").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
