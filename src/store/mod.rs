//! Storage abstraction
//!
//! Trait contracts for the account and user stores, shared by the
//! Postgres implementations and the in-memory doubles used in tests.
//! All balance and refresh-token mutation in the system goes through
//! these traits; nothing else writes the underlying records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Account, AccountQuery, User};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryAccountStore, MemoryUserStore};
pub use postgres::{PgAccountStore, PgUserStore};

/// Errors that can occur in a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The addressed record does not exist
    #[error("record not found")]
    NotFound,

    /// A concurrent update invalidated this one; safe to retry
    #[error("concurrent update detected")]
    Conflict,

    /// Unique-name constraint violated on insert
    #[error("name already taken")]
    DuplicateName,

    /// The backend rejected or aborted the call
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable keyed storage of [`Account`] records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch an account by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Persist a new account.
    async fn insert(&self, account: Account) -> Result<Account, StoreError>;

    /// List accounts: filter by exact (trimmed) name, count the total
    /// before paging, sort stably, apply skip/take, and reverse the
    /// paged window when `desc` is set. The query must already be
    /// normalized.
    async fn list(&self, query: &AccountQuery) -> Result<(Vec<Account>, u64), StoreError>;

    /// Atomically adjust one account's balance by a signed delta. The
    /// store guards the balance against going negative; a guard miss on
    /// an existing account reports [`StoreError::Conflict`].
    async fn apply_delta(&self, id: Uuid, delta: Decimal) -> Result<Account, StoreError>;

    /// Atomically debit the sender and credit the recipient. Both legs
    /// commit or neither does; no observer may see one leg applied
    /// without the other.
    async fn apply_transfer(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        amount: Decimal,
    ) -> Result<(Account, Account), StoreError>;
}

/// Durable keyed storage of [`User`] records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user by exact name.
    async fn get_by_name(&self, name: &str) -> Result<Option<User>, StoreError>;

    /// Persist a new user; duplicate names are rejected.
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    /// Replace (or clear, with `None`) the user's refresh token and its
    /// expiry in one write.
    async fn set_refresh_token(
        &self,
        name: &str,
        token: Option<String>,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<User, StoreError>;
}
