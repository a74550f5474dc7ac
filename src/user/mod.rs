pub mod auth;
mod sqlite_user_store;
mod user_manager;
pub mod user_models;
mod user_store;

pub use auth::{AuthToken, AuthTokenValue, PasswordCredentials, PasswordHasher};
pub use sqlite_user_store::SqliteUserStore;
pub use user_manager::{UserError, UserManager, UserResult};
pub use user_models::{LoginRequest, RegisteredUser, RegistrationRequest, User, UserUpdate};
pub use user_store::{UserAuthCredentialsStore, UserAuthTokenStore, UserStore};
