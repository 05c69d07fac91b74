//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::exchange::ExchangeError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Account name must not be empty")]
    EmptyName,

    #[error("Amount must be positive")]
    NonpositiveAmount,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Sender and recipient must differ")]
    DuplicateId,

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid currencies inputted")]
    InvalidCurrency(String),

    #[error("Invalid name or password")]
    Unauthenticated,

    #[error("Please log in again")]
    InvalidCredential,

    #[error("Concurrent update detected")]
    Conflict,

    // Server errors (5xx)
    #[error("Exchange rate provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => AppError::Conflict,
            StoreError::Database(e) => AppError::Database(e),
            // Contextual store errors are mapped at the call sites that
            // expect them; reaching here means a record vanished or a
            // uniqueness check raced mid-operation.
            StoreError::NotFound => AppError::Internal("record disappeared mid-operation".into()),
            StoreError::DuplicateName => {
                AppError::InvalidRequest("Name or password is invalid.".into())
            }
            StoreError::Unavailable(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ExchangeError> for AppError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::InvalidCurrency(details) => AppError::InvalidCurrency(details),
            ExchangeError::Upstream(msg) => AppError::UpstreamUnavailable(msg),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::EmptyName => (StatusCode::BAD_REQUEST, "empty_name", None),
            AppError::NonpositiveAmount => {
                (StatusCode::BAD_REQUEST, "nonpositive_amount", None)
            }
            AppError::InsufficientFunds => {
                (StatusCode::BAD_REQUEST, "insufficient_funds", None)
            }
            AppError::DuplicateId => (StatusCode::BAD_REQUEST, "duplicate_id", None),
            AppError::InvalidCredential => {
                (StatusCode::BAD_REQUEST, "invalid_credential", None)
            }

            // 401 Unauthorized
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated", None),

            // 404 Not Found
            AppError::AccountNotFound(id) => {
                (StatusCode::NOT_FOUND, "account_not_found", Some(id.clone()))
            }
            AppError::UserNotFound(name) => {
                (StatusCode::NOT_FOUND, "user_not_found", Some(name.clone()))
            }

            // 409 Conflict
            AppError::Conflict => (StatusCode::CONFLICT, "conflict", None),

            // 422 Unprocessable Entity
            AppError::InvalidCurrency(details) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_currency",
                Some(details.clone()),
            ),

            // 502 Bad Gateway
            AppError::UpstreamUnavailable(msg) => {
                tracing::error!("Exchange rate provider unavailable: {}", msg);
                (StatusCode::BAD_GATEWAY, "upstream_unavailable", None)
            }

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_maps_to_conflict() {
        let err: AppError = StoreError::Conflict.into();
        assert!(matches!(err, AppError::Conflict));
    }

    #[test]
    fn test_exchange_errors_keep_their_classification() {
        let err: AppError = ExchangeError::InvalidCurrency("XXX".into()).into();
        assert!(matches!(err, AppError::InvalidCurrency(_)));

        let err: AppError = ExchangeError::Upstream("timeout".into()).into();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }
}
