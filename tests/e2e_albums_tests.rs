//! End-to-end tests for album creation, updates, deletion and bulk approval

mod common;

use common::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn create_album_returns_the_new_row() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .create_album(&json!({
            "artist": ARTIST_3_ID,
            "album_name": "First Steps",
            "released_at": 1_700_000_000,
            "cost": "19.99"
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["artist_id"], ARTIST_3_ID);
    assert_eq!(body["album_name"], "First Steps");
    assert_eq!(body["cost"], "19.99");
    assert_eq!(body["is_approved"], false);
    assert!(body["created_at"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn create_album_accepts_numeric_cost() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .create_album(&json!({
            "artist": ARTIST_3_ID,
            "released_at": 1_700_000_000,
            "cost": 25
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["cost"], "25.00");
}

#[tokio::test]
async fn create_album_defaults_the_name() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .create_album(&json!({
            "artist": ARTIST_3_ID,
            "released_at": 1_700_000_000,
            "cost": "0.00"
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["album_name"], "New Album");
}

#[tokio::test]
async fn create_album_collects_required_field_errors() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.create_album(&json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["artist"][0], "This field is required.");
    assert_eq!(body["released_at"][0], "This field is required.");
    assert_eq!(body["cost"][0], "This field is required.");
}

#[tokio::test]
async fn create_album_rejects_malformed_cost_with_field_error() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .create_album(&json!({
            "artist": ARTIST_3_ID,
            "released_at": 1_700_000_000,
            "cost": "1.234"
        }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["cost"][0],
        "Ensure that there are no more than 2 decimal places."
    );

    let response = client
        .create_album(&json!({
            "artist": ARTIST_3_ID,
            "released_at": 1_700_000_000,
            "cost": "abc"
        }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["cost"][0], "A valid number is required.");
}

#[tokio::test]
async fn create_album_reports_malformed_cost_alongside_missing_fields() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.create_album(&json!({ "cost": "oops" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["artist"][0], "This field is required.");
    assert_eq!(body["released_at"][0], "This field is required.");
    assert_eq!(body["cost"][0], "A valid number is required.");
}

#[tokio::test]
async fn create_album_rejects_unknown_artist() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .create_album(&json!({
            "artist": 424242,
            "released_at": 1_700_000_000,
            "cost": "1.00"
        }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["artist"][0],
        "Invalid pk \"424242\" - object does not exist."
    );
}

#[tokio::test]
async fn create_album_requires_authentication() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .create_album(&json!({
            "artist": ARTIST_1_ID,
            "released_at": 1_700_000_000,
            "cost": "1.00"
        }))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patch_album_merges_only_present_fields() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .patch_album(ALBUM_1_ID, &json!({ "cost": "42.00" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["cost"], "42.00");
    // Untouched fields keep their value
    assert_eq!(body["album_name"], ALBUM_1_NAME);
}

#[tokio::test]
async fn patch_album_rejects_malformed_cost_with_field_error() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .patch_album(ALBUM_1_ID, &json!({ "cost": "9.999" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["cost"][0],
        "Ensure that there are no more than 2 decimal places."
    );

    // The album keeps its seeded cost
    let body: Value = client
        .patch_album(ALBUM_1_ID, &json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["cost"], "9.99");
}

#[tokio::test]
async fn patch_unknown_album_is_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .patch_album(424242, &json!({ "album_name": "Ghost" }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_album_cascades_to_its_songs() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    // Album 2 holds a single song; deleting the album bypasses the
    // last-song guard because the album goes away with it.
    let response = client.delete_album(ALBUM_2_ID).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client.get_song_audio(SONG_3_ID).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    use discograph_server::catalog_store::CatalogStore;
    assert_eq!(server.catalog_store.get_albums_count(), 2);
    assert_eq!(server.catalog_store.get_songs_count(), 3);
}

#[tokio::test]
async fn approve_single_album_uses_singular_message() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.approve_albums(&[ALBUM_1_ID]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["approved"], 1);
    assert_eq!(body["message"], "1 album was successfully approved");
}

#[tokio::test]
async fn approve_many_albums_uses_plural_message() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .approve_albums(&[ALBUM_1_ID, ALBUM_2_ID, ALBUM_3_ID])
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["approved"], 3);
    assert_eq!(body["message"], "3 albums were successfully approved");
}

#[tokio::test]
async fn approve_skips_already_approved_and_unknown_ids() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.approve_albums(&[ALBUM_1_ID]).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Re-approving album 1 and naming a bogus id only counts album 2
    let response = client
        .approve_albums(&[ALBUM_1_ID, ALBUM_2_ID, 424242])
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["approved"], 1);
    assert_eq!(body["message"], "1 album was successfully approved");
}

#[tokio::test]
async fn approve_empty_selection_counts_zero() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.approve_albums(&[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["approved"], 0);
    assert_eq!(body["message"], "0 albums were successfully approved");
}

#[tokio::test]
async fn approve_requires_authentication() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.approve_albums(&[ALBUM_1_ID]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
