use super::auth::{AuthToken, AuthTokenValue, PasswordCredentials, PasswordHasher};
use super::user_models::{LoginRequest, RegisteredUser, RegistrationRequest, User, UserUpdate};
use super::user_store::UserStore;
use crate::validation::{
    is_valid_email, FieldErrors, MIN_PASSWORD_LENGTH, MSG_INVALID_EMAIL, MSG_PASSWORD_MISMATCH,
    MSG_PASSWORD_TOO_SHORT, MSG_REQUIRED, MSG_UNIQUE,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

#[derive(thiserror::Error, Debug)]
pub enum UserError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("Unable to log in with provided credentials.")]
    InvalidCredentials,

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("Not found.")]
    NotFound,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type UserResult<T> = std::result::Result<T, UserError>;

/// Account workflows on top of a [`UserStore`]: registration with its
/// validation pipeline, credential verification, token issuance and
/// owner-only profile updates.
pub struct UserManager {
    user_store: Arc<Mutex<Box<dyn UserStore>>>,
}

impl UserManager {
    pub fn new(user_store: Box<dyn UserStore>) -> Self {
        Self {
            user_store: Arc::new(Mutex::new(user_store)),
        }
    }

    /// Validates and creates an account. All field violations are collected
    /// into one error so the client sees everything at once.
    pub fn register(&self, request: RegistrationRequest) -> UserResult<RegisteredUser> {
        let store = self.user_store.lock().unwrap();
        let mut errors = FieldErrors::new();

        let username = match non_empty(&request.username) {
            Some(username) => {
                if store.username_exists(username)? {
                    errors.push("username", MSG_UNIQUE);
                }
                username.to_string()
            }
            None => {
                errors.push("username", MSG_REQUIRED);
                String::new()
            }
        };

        // Email is optional; when present it is lowercased before both the
        // uniqueness check and storage.
        let email = match non_empty(&request.email) {
            Some(raw) => {
                let lowered = raw.to_lowercase();
                if !is_valid_email(&lowered) {
                    errors.push("email", MSG_INVALID_EMAIL);
                } else if store.email_exists(&lowered)? {
                    errors.push("email", MSG_UNIQUE);
                }
                lowered
            }
            None => String::new(),
        };

        let password1 = match non_empty(&request.password1) {
            Some(password) => {
                if password.chars().count() < MIN_PASSWORD_LENGTH {
                    errors.push("password1", MSG_PASSWORD_TOO_SHORT);
                }
                Some(password)
            }
            None => {
                errors.push("password1", MSG_REQUIRED);
                None
            }
        };

        let password2 = match non_empty(&request.password2) {
            Some(password) => Some(password),
            None => {
                errors.push("password2", MSG_REQUIRED);
                None
            }
        };

        if let (Some(p1), Some(p2)) = (password1, password2) {
            if p1 != p2 {
                errors.push("password2", MSG_PASSWORD_MISMATCH);
            }
        }

        if !errors.is_empty() {
            return Err(UserError::Validation(errors));
        }

        let password = password1.expect("validated above");
        let user_id = store.create_user(&username, &email)?;
        store.set_password_credentials(Self::create_hashed_password(user_id, password)?)?;

        Ok(RegisteredUser { username, email })
    }

    fn create_hashed_password(user_id: i64, password: &str) -> Result<PasswordCredentials> {
        let hasher = PasswordHasher::default_hasher();
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(PasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
            last_used: None,
        })
    }

    /// Verifies the credentials and issues a fresh token. Failures are
    /// deliberately indistinguishable (unknown user vs wrong password).
    pub fn login(&mut self, request: LoginRequest) -> UserResult<(AuthToken, User)> {
        let mut errors = FieldErrors::new();
        if non_empty(&request.username).is_none() {
            errors.push("username", MSG_REQUIRED);
        }
        if non_empty(&request.password).is_none() {
            errors.push("password", MSG_REQUIRED);
        }
        if !errors.is_empty() {
            return Err(UserError::Validation(errors));
        }
        let username = request.username.as_deref().expect("validated above");
        let password = request.password.as_deref().expect("validated above");

        let store = self.user_store.lock().unwrap();
        let user = store
            .get_user_by_username(username)?
            .ok_or(UserError::InvalidCredentials)?;
        let credentials = store
            .get_password_credentials(user.id)?
            .ok_or(UserError::InvalidCredentials)?;

        if !credentials.hasher.verify(password, &credentials.hash)? {
            return Err(UserError::InvalidCredentials);
        }
        store.update_password_last_used(user.id)?;

        let token = AuthToken {
            user_id: user.id,
            value: AuthTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        store.add_auth_token(token.clone())?;

        Ok((token, user))
    }

    /// Revokes the presented token.
    pub fn logout(&mut self, token_value: &AuthTokenValue) -> UserResult<()> {
        let removed = self.user_store.lock().unwrap().delete_auth_token(token_value)?;
        match removed {
            Some(_) => Ok(()),
            None => Err(UserError::NotFound),
        }
    }

    /// Resolves a presented token to its owning user id, stamping last_used.
    pub fn resolve_token(&self, token_value: &AuthTokenValue) -> Result<Option<i64>> {
        let store = self.user_store.lock().unwrap();
        match store.get_auth_token(token_value)? {
            Some(token) => {
                store.update_auth_token_last_used(token_value)?;
                Ok(Some(token.user_id))
            }
            None => Ok(None),
        }
    }

    pub fn get_user(&self, id: i64) -> UserResult<User> {
        self.user_store
            .lock()
            .unwrap()
            .get_user(id)?
            .ok_or(UserError::NotFound)
    }

    /// Owner-only profile update with merge semantics. `require_username`
    /// distinguishes PUT (full representation) from PATCH.
    pub fn update_user(
        &self,
        requester_id: i64,
        target_id: i64,
        update: UserUpdate,
        require_username: bool,
    ) -> UserResult<User> {
        if requester_id != target_id {
            return Err(UserError::Forbidden);
        }
        let store = self.user_store.lock().unwrap();
        let mut user = store.get_user(target_id)?.ok_or(UserError::NotFound)?;

        let mut errors = FieldErrors::new();

        match non_empty(&update.username) {
            Some(username) => {
                if username != user.username && store.username_exists(username)? {
                    errors.push("username", MSG_UNIQUE);
                } else {
                    user.username = username.to_string();
                }
            }
            None => {
                if require_username {
                    errors.push("username", MSG_REQUIRED);
                }
            }
        }

        if let Some(raw) = &update.email {
            let lowered = raw.to_lowercase();
            if !raw.is_empty() && !is_valid_email(&lowered) {
                errors.push("email", MSG_INVALID_EMAIL);
            } else if lowered != user.email && !lowered.is_empty() && store.email_exists(&lowered)?
            {
                errors.push("email", MSG_UNIQUE);
            } else {
                user.email = lowered;
            }
        }

        if let Some(bio) = update.bio {
            user.bio = bio;
        }

        if !errors.is_empty() {
            return Err(UserError::Validation(errors));
        }

        store.update_user(&user)?;
        Ok(user)
    }

    pub fn get_users_count(&self) -> usize {
        self.user_store.lock().unwrap().get_users_count()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
