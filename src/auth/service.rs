//! Authentication facade
//!
//! Thin composition of the user store, the password verifier and the
//! token rotation engine. Login and registration failures are reported
//! without revealing whether the name or the password was wrong.

use std::sync::Arc;

use crate::auth::password::PasswordVerifier;
use crate::auth::token::{TokenPair, TokenService};
use crate::domain::User;
use crate::error::{AppError, AppResult};
use crate::store::{StoreError, UserStore};

const INVALID_NAME_OR_PASSWORD: &str = "Name or password is invalid.";

/// Login, registration and token lifecycle entry point.
#[derive(Clone)]
pub struct AuthenticationService {
    users: Arc<dyn UserStore>,
    passwords: Arc<dyn PasswordVerifier>,
    tokens: TokenService,
}

impl AuthenticationService {
    pub fn new(
        users: Arc<dyn UserStore>,
        passwords: Arc<dyn PasswordVerifier>,
        tokens: TokenService,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    /// Register a new user with a hashed password.
    pub async fn register(&self, name: &str, password: &str) -> AppResult<User> {
        if name.trim().is_empty() || password.is_empty() {
            return Err(AppError::InvalidRequest(INVALID_NAME_OR_PASSWORD.into()));
        }
        if self.users.get_by_name(name).await?.is_some() {
            return Err(AppError::InvalidRequest(INVALID_NAME_OR_PASSWORD.into()));
        }

        let hash = self.passwords.hash(password)?;
        match self.users.insert(User::new(name, hash)).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "User registered");
                Ok(user)
            }
            Err(StoreError::DuplicateName) => {
                Err(AppError::InvalidRequest(INVALID_NAME_OR_PASSWORD.into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verify credentials and issue a token pair.
    pub async fn login(&self, name: &str, password: &str) -> AppResult<TokenPair> {
        // One failure path for both causes so the response never reveals
        // whether the name or the password was wrong.
        match self.users.get_by_name(name).await? {
            Some(user) if self.passwords.matches(&user.password_hash, password) => {
                self.tokens.build_token(&user).await
            }
            _ => Err(AppError::Unauthenticated),
        }
    }

    /// Redeem a refresh token and rotate in a fresh pair.
    pub async fn refresh(&self, name: &str, refresh_token: &str) -> AppResult<TokenPair> {
        let user = self
            .tokens
            .take_refresh_token(name, refresh_token)
            .await?
            .ok_or(AppError::InvalidCredential)?;

        self.tokens.build_token(&user).await
    }

    /// Invalidate the user's current refresh token.
    pub async fn revoke(&self, name: &str, refresh_token: &str) -> AppResult<()> {
        if self.tokens.revoke(name, refresh_token).await? {
            Ok(())
        } else {
            Err(AppError::InvalidCredential)
        }
    }
}
