use serde::{Deserialize, Serialize};

/// Account row as exposed on the public profile endpoint.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub bio: String,
}

/// Registration input. Every field is optional at the parsing layer so the
/// validation pipeline can report all missing fields at once.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegistrationRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password1: Option<String>,
    pub password2: Option<String>,
}

/// Body of a successful registration, deliberately thin.
#[derive(Clone, Debug, Serialize)]
pub struct RegisteredUser {
    pub username: String,
    pub email: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Profile update. PATCH merges present fields; PUT additionally requires
/// `username` to be present.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}
