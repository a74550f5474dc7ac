//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client with token-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Session token obtained at login, sent in the Authorization header
    pub token: Option<String>,
    /// Id of the logged-in user, parsed from the login response
    pub user_id: Option<i64>,
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows and anonymous access.
    /// For most tests, use `authenticated()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
            user_id: None,
        }
    }

    /// Creates a client registered and logged in as the primary test user
    ///
    /// # Panics
    ///
    /// Panics if registration or login fails (indicates test infrastructure
    /// problem).
    pub async fn authenticated(base_url: String) -> Self {
        Self::registered(base_url, TEST_USER, TEST_EMAIL, TEST_PASS).await
    }

    /// Registers and logs in a user with the given credentials
    pub async fn registered(base_url: String, username: &str, email: &str, password: &str) -> Self {
        let mut client = Self::new(base_url);

        let response = client.register(username, Some(email), password, password).await;
        assert_eq!(
            response.status(),
            StatusCode::CREATED,
            "Test user registration failed: {:?}",
            response.text().await
        );

        let response = client.login(username, password).await;
        assert_eq!(
            response.status(),
            StatusCode::OK,
            "Test user login failed: {:?}",
            response.text().await
        );
        let body: Value = response.json().await.expect("Login response is not json");
        client.token = body["token"].as_str().map(|s| s.to_string());
        client.user_id = body["user"]["id"].as_i64();
        assert!(client.token.is_some(), "Login response carried no token");

        client
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Token {}", token)),
            None => builder,
        }
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /authentication/register/
    pub async fn register(
        &self,
        username: &str,
        email: Option<&str>,
        password1: &str,
        password2: &str,
    ) -> Response {
        let mut body = json!({
            "username": username,
            "password1": password1,
            "password2": password2,
        });
        if let Some(email) = email {
            body["email"] = json!(email);
        }
        self.register_raw(&body).await
    }

    /// POST /authentication/register/ with an arbitrary body
    pub async fn register_raw(&self, body: &Value) -> Response {
        self.client
            .post(format!("{}/authentication/register/", self.base_url))
            .json(body)
            .send()
            .await
            .expect("Register request failed")
    }

    /// POST /authentication/login/
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/authentication/login/", self.base_url))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// POST /authentication/logout/
    pub async fn logout(&self) -> Response {
        self.with_auth(
            self.client
                .post(format!("{}/authentication/logout/", self.base_url)),
        )
        .send()
        .await
        .expect("Logout request failed")
    }

    // ========================================================================
    // Home
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.with_auth(self.client.get(format!("{}/", self.base_url)))
            .send()
            .await
            .expect("Home request failed")
    }

    // ========================================================================
    // Artist Endpoints
    // ========================================================================

    /// GET /artists/
    pub async fn get_artists(&self) -> Response {
        self.with_auth(self.client.get(format!("{}/artists/", self.base_url)))
            .send()
            .await
            .expect("Get artists request failed")
    }

    /// GET /artists/albums/
    pub async fn get_artists_albums(&self) -> Response {
        self.with_auth(
            self.client
                .get(format!("{}/artists/albums/", self.base_url)),
        )
        .send()
        .await
        .expect("Get artists albums request failed")
    }

    /// GET /artists/{id}/
    pub async fn get_artist(&self, id: i64) -> Response {
        self.with_auth(
            self.client
                .get(format!("{}/artists/{}/", self.base_url, id)),
        )
        .send()
        .await
        .expect("Get artist request failed")
    }

    /// POST /artists/
    pub async fn create_artist(&self, body: &Value) -> Response {
        self.with_auth(self.client.post(format!("{}/artists/", self.base_url)))
            .json(body)
            .send()
            .await
            .expect("Create artist request failed")
    }

    // ========================================================================
    // Album Endpoints
    // ========================================================================

    /// POST /albums/
    pub async fn create_album(&self, body: &Value) -> Response {
        self.with_auth(self.client.post(format!("{}/albums/", self.base_url)))
            .json(body)
            .send()
            .await
            .expect("Create album request failed")
    }

    /// PATCH /albums/{id}
    pub async fn patch_album(&self, id: i64, body: &Value) -> Response {
        self.with_auth(
            self.client
                .patch(format!("{}/albums/{}", self.base_url, id)),
        )
        .json(body)
        .send()
        .await
        .expect("Patch album request failed")
    }

    /// DELETE /albums/{id}
    pub async fn delete_album(&self, id: i64) -> Response {
        self.with_auth(
            self.client
                .delete(format!("{}/albums/{}", self.base_url, id)),
        )
        .send()
        .await
        .expect("Delete album request failed")
    }

    /// POST /albums/approve/
    pub async fn approve_albums(&self, ids: &[i64]) -> Response {
        self.with_auth(
            self.client
                .post(format!("{}/albums/approve/", self.base_url)),
        )
        .json(&json!({ "ids": ids }))
        .send()
        .await
        .expect("Approve albums request failed")
    }

    // ========================================================================
    // Song Endpoints
    // ========================================================================

    /// POST /albums/{id}/songs/ as multipart form data
    pub async fn create_song(
        &self,
        album_id: i64,
        name: Option<&str>,
        audio: Option<(&str, Vec<u8>)>,
        image: Option<(&str, Vec<u8>)>,
    ) -> Response {
        let mut form = Form::new();
        if let Some(name) = name {
            form = form.text("name", name.to_string());
        }
        if let Some((file_name, bytes)) = audio {
            form = form.part("audio", Part::bytes(bytes).file_name(file_name.to_string()));
        }
        if let Some((file_name, bytes)) = image {
            form = form.part("image", Part::bytes(bytes).file_name(file_name.to_string()));
        }

        self.with_auth(
            self.client
                .post(format!("{}/albums/{}/songs/", self.base_url, album_id)),
        )
        .multipart(form)
        .send()
        .await
        .expect("Create song request failed")
    }

    /// PATCH /songs/{id}
    pub async fn rename_song(&self, id: i64, body: &Value) -> Response {
        self.with_auth(
            self.client
                .patch(format!("{}/songs/{}", self.base_url, id)),
        )
        .json(body)
        .send()
        .await
        .expect("Rename song request failed")
    }

    /// DELETE /songs/{id}
    pub async fn delete_song(&self, id: i64) -> Response {
        self.with_auth(
            self.client
                .delete(format!("{}/songs/{}", self.base_url, id)),
        )
        .send()
        .await
        .expect("Delete song request failed")
    }

    /// POST /songs/delete/
    pub async fn delete_songs(&self, ids: &[i64]) -> Response {
        self.with_auth(
            self.client
                .post(format!("{}/songs/delete/", self.base_url)),
        )
        .json(&json!({ "ids": ids }))
        .send()
        .await
        .expect("Delete songs request failed")
    }

    /// GET /songs/{id}/audio
    pub async fn get_song_audio(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/songs/{}/audio", self.base_url, id))
            .send()
            .await
            .expect("Get song audio request failed")
    }

    /// GET /songs/{id}/image
    pub async fn get_song_image(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/songs/{}/image", self.base_url, id))
            .send()
            .await
            .expect("Get song image request failed")
    }

    // ========================================================================
    // User Endpoints
    // ========================================================================

    /// GET /users/{id}/
    pub async fn get_user(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/users/{}/", self.base_url, id))
            .send()
            .await
            .expect("Get user request failed")
    }

    /// PATCH /users/{id}/
    pub async fn patch_user(&self, id: i64, body: &Value) -> Response {
        self.with_auth(
            self.client
                .patch(format!("{}/users/{}/", self.base_url, id)),
        )
        .json(body)
        .send()
        .await
        .expect("Patch user request failed")
    }

    /// PUT /users/{id}/
    pub async fn put_user(&self, id: i64, body: &Value) -> Response {
        self.with_auth(self.client.put(format!("{}/users/{}/", self.base_url, id)))
            .json(body)
            .send()
            .await
            .expect("Put user request failed")
    }
}
