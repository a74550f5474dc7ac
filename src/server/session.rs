use super::error::ApiError;
use super::state::ServerState;
use crate::user::auth::AuthTokenValue;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::debug;

#[derive(Debug)]
pub struct Session {
    pub user_id: i64,
    pub token: AuthTokenValue,
}

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

pub struct SessionExtractionError;

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        ApiError::Unauthorized.into_response()
    }
}

async fn extract_session_token_from_cookies(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<String> {
    CookieJar::from_request_parts(parts, ctx)
        .await
        .expect("Could not read cookies into CookieJar.")
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(Cookie::value)
        .map(|s| s.to_string())
}

/// Accepts the raw token as well as the `Token <value>` and `Bearer <value>`
/// header schemes.
fn extract_session_token_from_headers(parts: &mut Parts) -> Option<String> {
    let raw = parts
        .headers
        .get(HEADER_SESSION_TOKEN_KEY)
        .and_then(|v| v.to_str().ok())?;
    let token = raw
        .strip_prefix("Token ")
        .or_else(|| raw.strip_prefix("Bearer "))
        .unwrap_or(raw);
    Some(token.to_string())
}

async fn extract_session_from_request_parts(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<Session> {
    let token = match extract_session_token_from_cookies(parts, ctx)
        .await
        .or_else(|| extract_session_token_from_headers(parts))
    {
        None => {
            debug!("No token in cookies nor headers.");
            return None;
        }
        Some(x) => x,
    };

    let token_value = AuthTokenValue(token);
    let user_manager = ctx.user_manager.lock().unwrap();
    match user_manager.resolve_token(&token_value) {
        Ok(Some(user_id)) => Some(Session {
            user_id,
            token: token_value,
        }),
        Ok(None) => {
            debug!("Auth token not found in database");
            None
        }
        Err(e) => {
            debug!("Failed to get auth token from database: {}", e);
            None
        }
    }
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
            .await
            .ok_or(SessionExtractionError)
    }
}
