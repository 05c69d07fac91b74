//! Configuration module
//!
//! Loads configuration from environment variables.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::env;

/// Minimum HMAC key length for access-token signing (256 bits).
const MIN_SECRET_BYTES: usize = 32;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Base64-encoded HMAC secret for access-token signing
    pub auth_secret: String,

    /// Issuer claim stamped into access tokens
    pub auth_issuer: String,

    /// Audience claim stamped into access tokens
    pub auth_audience: String,

    /// Exchange-rate provider endpoint
    pub exchange_api_url: String,

    /// Exchange-rate provider API key
    pub exchange_api_key: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let auth_secret =
            env::var("AUTH_SECRET").map_err(|_| ConfigError::MissingEnv("AUTH_SECRET"))?;

        let auth_issuer =
            env::var("AUTH_ISSUER").unwrap_or_else(|_| "bank_ledger".to_string());

        let auth_audience =
            env::var("AUTH_AUDIENCE").unwrap_or_else(|_| "bank_ledger_clients".to_string());

        let exchange_api_url = env::var("EXCHANGE_API_URL")
            .map_err(|_| ConfigError::MissingEnv("EXCHANGE_API_URL"))?;

        let exchange_api_key = env::var("EXCHANGE_API_KEY")
            .map_err(|_| ConfigError::MissingEnv("EXCHANGE_API_KEY"))?;

        let config = Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            auth_secret,
            auth_issuer,
            auth_audience,
            exchange_api_url,
            exchange_api_key,
        };

        // Fail fast on an undersized or malformed signing key.
        config.auth_secret_bytes()?;

        Ok(config)
    }

    /// Decode the signing secret, enforcing the minimum key length.
    pub fn auth_secret_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        let bytes = BASE64
            .decode(&self.auth_secret)
            .map_err(|_| ConfigError::InvalidValue("AUTH_SECRET"))?;
        if bytes.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::InvalidValue("AUTH_SECRET"));
        }
        Ok(bytes)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
