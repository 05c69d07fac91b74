//! User entity
//!
//! A registered user with a hashed password and the refresh-token slot
//! managed by the token rotation engine. A user holds at most one live
//! refresh token at a time; issuing or redeeming always replaces it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Username (unique, case-sensitive)
    pub name: String,

    /// Password hash, never serialized outward
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Currently issued refresh token, if any
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,

    /// Expiry of the current refresh token
    #[serde(skip_serializing)]
    pub refresh_token_expiry: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new user with a fresh ID and no refresh token.
    pub fn new(name: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            password_hash: password_hash.into(),
            refresh_token: None,
            refresh_token_expiry: None,
        }
    }

    /// Whether the presented token matches the stored one and has not
    /// expired at `now`.
    pub fn refresh_token_live(&self, presented: &str, now: DateTime<Utc>) -> bool {
        self.refresh_token.as_deref() == Some(presented)
            && self.refresh_token_expiry.is_some_and(|expiry| expiry >= now)
    }
}
