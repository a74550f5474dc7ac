use super::auth::{AuthToken, AuthTokenValue, PasswordCredentials};
use super::user_models::User;
use anyhow::Result;

pub trait UserAuthCredentialsStore: Send + Sync {
    /// Returns the user's password credentials.
    /// Returns Ok(None) if the user has none.
    fn get_password_credentials(&self, user_id: i64) -> Result<Option<PasswordCredentials>>;

    /// Inserts or replaces the user's password credentials.
    fn set_password_credentials(&self, credentials: PasswordCredentials) -> Result<()>;

    /// Stamps the credentials row after a successful login.
    fn update_password_last_used(&self, user_id: i64) -> Result<()>;
}

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns Ok(None) if the token does not exist.
    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    fn add_auth_token(&self, token: AuthToken) -> Result<()>;

    /// Deletes a token, returning it if it existed.
    fn delete_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    fn update_auth_token_last_used(&self, value: &AuthTokenValue) -> Result<()>;
}

pub trait UserStore: UserAuthTokenStore + UserAuthCredentialsStore + Send + Sync {
    /// Creates a new user and returns its id. The email must already be
    /// lowercased by the caller.
    fn create_user(&self, username: &str, email: &str) -> Result<i64>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, id: i64) -> Result<Option<User>>;

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    fn username_exists(&self, username: &str) -> Result<bool>;

    /// Case-insensitive: expects a lowercased value and matches against the
    /// lowercased stored emails.
    fn email_exists(&self, email_lowercase: &str) -> Result<bool>;

    /// Persists username/email/bio of an existing user.
    fn update_user(&self, user: &User) -> Result<()>;

    fn get_users_count(&self) -> usize;
}
