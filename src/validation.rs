//! Field-scoped validation errors shared by the account and catalog endpoints.
//!
//! Errors are keyed by field name and serialized as `{"field": ["message", ...]}`
//! so clients can attach messages to the offending form inputs.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_UNIQUE: &str = "This field must be unique.";
pub const MSG_INVALID_EMAIL: &str = "Enter a valid email address.";
pub const MSG_PASSWORD_TOO_SHORT: &str =
    "This password is too short. It must contain at least 8 characters.";
pub const MSG_PASSWORD_MISMATCH: &str = "Password fields do not match";
pub const MSG_INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";
pub const MSG_NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub const MSG_NO_PERMISSION: &str = "You do not have permission to perform this action.";

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Accumulates validation failures per field. All applicable violations are
/// collected before the request is rejected, so a single response carries
/// every field the client needs to fix.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is checked at startup")
    })
}

/// Loose structural check, enough to catch obvious typos like a missing '@'
/// or domain. Real deliverability is out of scope.
pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_match(value)
}
