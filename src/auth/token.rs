//! Token issuance and rotation
//!
//! Access tokens are short-lived HS256-signed JWTs asserting the user's
//! name. Refresh tokens are opaque random strings redeemable exactly
//! once: every issuance overwrites the stored token, and a successful
//! redemption clears it. Per user the refresh-token slot moves
//! `Absent -> Active(token, expiry) -> Absent`; a mismatched or expired
//! presentation leaves it unchanged.

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64_URL};
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

use crate::domain::User;
use crate::error::{AppError, AppResult};
use crate::store::{StoreError, UserStore};

type HmacSha256 = Hmac<Sha256>;

/// Access-token lifetime.
const ACCESS_TOKEN_TTL_HOURS: i64 = 1;

/// Refresh-token lifetime.
const REFRESH_TOKEN_TTL_HOURS: i64 = 24;

/// Refresh-token entropy (256 bits).
const REFRESH_TOKEN_BYTES: usize = 32;

/// An access/refresh token pair issued to a user.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User name
    pub sub: String,
    pub iss: String,
    pub aud: String,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// HS256 signer/verifier for access tokens.
#[derive(Clone)]
pub struct AccessTokenSigner {
    secret: Vec<u8>,
    issuer: String,
    audience: String,
}

impl AccessTokenSigner {
    pub fn new(secret: Vec<u8>, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            secret,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Sign an access token for `name`, valid for one hour from `now`.
    pub fn sign(&self, name: &str, now: DateTime<Utc>) -> AppResult<String> {
        let claims = Claims {
            sub: name.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(ACCESS_TOKEN_TTL_HOURS)).timestamp(),
        };

        let header = BASE64_URL.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = BASE64_URL.encode(
            serde_json::to_vec(&claims).map_err(|e| AppError::Internal(e.to_string()))?,
        );
        let signing_input = format!("{header}.{payload}");

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        let signature = BASE64_URL.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify a token's signature and expiry, returning its claims.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let mut parts = token.splitn(4, '.');
        let (header, payload, signature) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(p), Some(s), None) => (h, p, s),
                _ => return Err(AppError::Unauthenticated),
            };

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        mac.update(format!("{header}.{payload}").as_bytes());
        let sig_bytes = BASE64_URL
            .decode(signature)
            .map_err(|_| AppError::Unauthenticated)?;
        mac.verify_slice(&sig_bytes)
            .map_err(|_| AppError::Unauthenticated)?;

        let payload_bytes = BASE64_URL
            .decode(payload)
            .map_err(|_| AppError::Unauthenticated)?;
        let claims: Claims =
            serde_json::from_slice(&payload_bytes).map_err(|_| AppError::Unauthenticated)?;

        if claims.exp < Utc::now().timestamp()
            || claims.iss != self.issuer
            || claims.aud != self.audience
        {
            return Err(AppError::Unauthenticated);
        }

        Ok(claims)
    }
}

/// Refresh-token rotation engine over a user store.
#[derive(Clone)]
pub struct TokenService {
    users: Arc<dyn UserStore>,
    signer: AccessTokenSigner,
}

impl TokenService {
    pub fn new(users: Arc<dyn UserStore>, signer: AccessTokenSigner) -> Self {
        Self { users, signer }
    }

    /// Issue a fresh access/refresh pair for a user.
    ///
    /// Persisting the new refresh token is the rotation point: whatever
    /// token the user held before stops redeeming here.
    pub async fn build_token(&self, user: &User) -> AppResult<TokenPair> {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let refresh_token = BASE64.encode(bytes);

        let now = Utc::now();
        let access_token = self.signer.sign(&user.name, now)?;

        self.users
            .set_refresh_token(
                &user.name,
                Some(refresh_token.clone()),
                Some(now + Duration::hours(REFRESH_TOKEN_TTL_HOURS)),
            )
            .await
            .map_err(|e| user_error(&user.name, e))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Redeem a refresh token, consuming it.
    ///
    /// Returns `None` when the user does not exist, the token does not
    /// match, or the token has expired; the stored state is untouched in
    /// all three cases. On success the stored token is cleared so a
    /// second redemption of the same string fails.
    pub async fn take_refresh_token(&self, name: &str, presented: &str) -> AppResult<Option<User>> {
        let Some(user) = self.users.get_by_name(name).await? else {
            return Ok(None);
        };

        if !user.refresh_token_live(presented, Utc::now()) {
            return Ok(None);
        }

        let user = self
            .users
            .set_refresh_token(name, None, None)
            .await
            .map_err(|e| user_error(name, e))?;
        Ok(Some(user))
    }

    /// Invalidate the user's current refresh token.
    ///
    /// Matches on the token string only; an expired token can still be
    /// revoked. Returns `false` when the user is missing or the token
    /// does not match.
    pub async fn revoke(&self, name: &str, presented: &str) -> AppResult<bool> {
        let Some(user) = self.users.get_by_name(name).await? else {
            return Ok(false);
        };

        if user.refresh_token.as_deref() != Some(presented) {
            return Ok(false);
        }

        self.users
            .set_refresh_token(name, None, None)
            .await
            .map_err(|e| user_error(name, e))?;
        Ok(true)
    }
}

fn user_error(name: &str, e: StoreError) -> AppError {
    match e {
        StoreError::NotFound => AppError::UserNotFound(name.to_string()),
        other => other.into(),
    }
}
