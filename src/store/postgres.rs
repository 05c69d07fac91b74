//! Postgres stores
//!
//! sqlx-backed implementations of the store traits. Balance guards live
//! in the UPDATE statements themselves, so concurrent writers serialize
//! on the row and a lost guard surfaces as [`StoreError::Conflict`]
//! rather than a negative balance. Transfers run both legs inside one
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Account, AccountQuery, SortKey, User};

use super::{AccountStore, StoreError, UserStore};

/// Postgres-backed [`AccountStore`].
#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn get(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as("SELECT id, name, balance FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn insert(&self, account: Account) -> Result<Account, StoreError> {
        let inserted = sqlx::query_as(
            r#"
            INSERT INTO accounts (id, name, balance)
            VALUES ($1, $2, $3)
            RETURNING id, name, balance
            "#,
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(account.balance)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn list(&self, query: &AccountQuery) -> Result<(Vec<Account>, u64), StoreError> {
        let name = query
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let total: i64 = match name {
            Some(n) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE name = $1")
                    .bind(n)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        // created_at is the tiebreaker: it is the store order unsorted
        // listings promise, and keeps the keyed sorts stable.
        let order = match query.sort_by {
            SortKey::Name => "name, created_at",
            SortKey::Balance => "balance, created_at",
            SortKey::Unsorted => "created_at",
        };

        let mut page: Vec<Account> = match name {
            Some(n) => {
                let sql = format!(
                    "SELECT id, name, balance FROM accounts WHERE name = $1 \
                     ORDER BY {order} LIMIT $2 OFFSET $3"
                );
                sqlx::query_as(&sql)
                    .bind(n)
                    .bind(i64::from(query.page_size))
                    .bind(query.offset() as i64)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT id, name, balance FROM accounts \
                     ORDER BY {order} LIMIT $1 OFFSET $2"
                );
                sqlx::query_as(&sql)
                    .bind(i64::from(query.page_size))
                    .bind(query.offset() as i64)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        // Descending reverses the fetched page only, never the full
        // result set. Existing clients depend on this.
        if query.desc {
            page.reverse();
        }

        Ok((page, total as u64))
    }

    async fn apply_delta(&self, id: Uuid, delta: Decimal) -> Result<Account, StoreError> {
        let updated: Option<Account> = sqlx::query_as(
            r#"
            UPDATE accounts
            SET balance = balance + $2
            WHERE id = $1 AND balance + $2 >= 0
            RETURNING id, name, balance
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(account) => Ok(account),
            None if self.exists(id).await? => Err(StoreError::Conflict),
            None => Err(StoreError::NotFound),
        }
    }

    async fn apply_transfer(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        amount: Decimal,
    ) -> Result<(Account, Account), StoreError> {
        let mut tx = self.pool.begin().await?;

        let debited: Option<Account> = sqlx::query_as(
            r#"
            UPDATE accounts
            SET balance = balance - $2
            WHERE id = $1 AND balance >= $2
            RETURNING id, name, balance
            "#,
        )
        .bind(sender_id)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(sender) = debited else {
            tx.rollback().await?;
            return if self.exists(sender_id).await? {
                Err(StoreError::Conflict)
            } else {
                Err(StoreError::NotFound)
            };
        };

        let credited: Option<Account> = sqlx::query_as(
            r#"
            UPDATE accounts
            SET balance = balance + $2
            WHERE id = $1
            RETURNING id, name, balance
            "#,
        )
        .bind(recipient_id)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(recipient) = credited else {
            tx.rollback().await?;
            return Err(StoreError::NotFound);
        };

        tx.commit().await?;
        Ok((sender, recipient))
    }
}

/// Postgres-backed [`UserStore`].
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as(
            r#"
            SELECT id, name, password_hash, refresh_token, refresh_token_expiry
            FROM users
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let inserted = sqlx::query_as(
            r#"
            INSERT INTO users (id, name, password_hash, refresh_token, refresh_token_expiry)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, password_hash, refresh_token, refresh_token_expiry
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.refresh_token)
        .bind(user.refresh_token_expiry)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::DuplicateName,
            other => StoreError::Database(other),
        })?;
        Ok(inserted)
    }

    async fn set_refresh_token(
        &self,
        name: &str,
        token: Option<String>,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<User, StoreError> {
        let updated: Option<User> = sqlx::query_as(
            r#"
            UPDATE users
            SET refresh_token = $2, refresh_token_expiry = $3
            WHERE name = $1
            RETURNING id, name, password_hash, refresh_token, refresh_token_expiry
            "#,
        )
        .bind(name)
        .bind(token)
        .bind(expiry)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(StoreError::NotFound)
    }
}
