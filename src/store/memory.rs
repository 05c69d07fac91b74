//! In-memory stores
//!
//! Mutexed in-process implementations of the store traits, preserving
//! insertion order as the "store order" seen by unsorted listings. Used
//! by the test suites and available for local wiring without a
//! database; they share the exact contract of the Postgres stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Mutex;
use uuid::Uuid;

use crate::domain::{Account, AccountQuery, SortKey, User};

use super::{AccountStore, StoreError, UserStore};

/// In-memory [`AccountStore`].
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<Vec<Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.lock().expect("account store poisoned");
        Ok(accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn insert(&self, account: Account) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.lock().expect("account store poisoned");
        accounts.push(account.clone());
        Ok(account)
    }

    async fn list(&self, query: &AccountQuery) -> Result<(Vec<Account>, u64), StoreError> {
        let accounts = self.accounts.lock().expect("account store poisoned");

        let mut matching: Vec<Account> = match query.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => accounts
                .iter()
                .filter(|a| a.name == name)
                .cloned()
                .collect(),
            _ => accounts.clone(),
        };

        // Total count is taken before paging.
        let total = matching.len() as u64;

        // Vec::sort_by is stable, so ties keep store order.
        match query.sort_by {
            SortKey::Name => matching.sort_by(|a, b| a.name.cmp(&b.name)),
            SortKey::Balance => matching.sort_by(|a, b| a.balance.cmp(&b.balance)),
            SortKey::Unsorted => {}
        }

        let mut page: Vec<Account> = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .collect();

        // Descending reverses the fetched page only, never the full
        // result set. Existing clients depend on this.
        if query.desc {
            page.reverse();
        }

        Ok((page, total))
    }

    async fn apply_delta(&self, id: Uuid, delta: Decimal) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.lock().expect("account store poisoned");
        let account = accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound)?;

        if account.balance + delta < Decimal::ZERO {
            return Err(StoreError::Conflict);
        }
        account.balance += delta;
        Ok(account.clone())
    }

    async fn apply_transfer(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        amount: Decimal,
    ) -> Result<(Account, Account), StoreError> {
        let mut accounts = self.accounts.lock().expect("account store poisoned");

        let sender_idx = accounts
            .iter()
            .position(|a| a.id == sender_id)
            .ok_or(StoreError::NotFound)?;
        let recipient_idx = accounts
            .iter()
            .position(|a| a.id == recipient_id)
            .ok_or(StoreError::NotFound)?;

        if accounts[sender_idx].balance < amount {
            return Err(StoreError::Conflict);
        }

        // Both legs happen under the same lock; observers never see a
        // half-applied transfer.
        accounts[sender_idx].balance -= amount;
        accounts[recipient_idx].balance += amount;

        Ok((accounts[sender_idx].clone(), accounts[recipient_idx].clone()))
    }
}

/// In-memory [`UserStore`].
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().expect("user store poisoned");
        Ok(users.iter().find(|u| u.name == name).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.lock().expect("user store poisoned");
        if users.iter().any(|u| u.name == user.name) {
            return Err(StoreError::DuplicateName);
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn set_refresh_token(
        &self,
        name: &str,
        token: Option<String>,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<User, StoreError> {
        let mut users = self.users.lock().expect("user store poisoned");
        let user = users
            .iter_mut()
            .find(|u| u.name == name)
            .ok_or(StoreError::NotFound)?;

        user.refresh_token = token;
        user.refresh_token_expiry = expiry;
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn seeded_store() -> MemoryAccountStore {
        let store = MemoryAccountStore::new();
        for (name, balance) in [("carol", 30), ("alice", 10), ("bob", 20)] {
            let mut account = Account::new(name);
            account.balance = Decimal::from(balance);
            store.insert(account).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_list_unsorted_preserves_insertion_order() {
        let store = seeded_store().await;
        let (page, total) = store.list(&AccountQuery::new()).await.unwrap();

        assert_eq!(total, 3);
        let names: Vec<&str> = page.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["carol", "alice", "bob"]);
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let store = seeded_store().await;
        let query = AccountQuery::new().sorted_by(SortKey::Name);
        let (page, _) = store.list(&query).await.unwrap();

        let names: Vec<&str> = page.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn test_list_desc_reverses_only_the_page() {
        let store = seeded_store().await;
        let query = AccountQuery::new()
            .sorted_by(SortKey::Name)
            .descending(true)
            .page(1, 2)
            .normalized();
        let (page, total) = store.list(&query).await.unwrap();

        // Ascending page one is [alice, bob]; descending flips that
        // window instead of paging from the far end.
        let names: Vec<&str> = page.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["bob", "alice"]);
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_list_name_filter_counts_before_paging() {
        let store = seeded_store().await;
        let mut dup = Account::new("alice");
        dup.balance = dec!(99);
        store.insert(dup).await.unwrap();

        let query = AccountQuery::new().with_name("alice").page(1, 1).normalized();
        let (page, total) = store.list(&query).await.unwrap();

        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "alice");
    }

    #[tokio::test]
    async fn test_apply_delta_guards_negative_balance() {
        let store = seeded_store().await;
        let (accounts, _) = store.list(&AccountQuery::new()).await.unwrap();
        let alice = accounts.iter().find(|a| a.name == "alice").unwrap();

        let result = store.apply_delta(alice.id, dec!(-100)).await;
        assert!(matches!(result, Err(StoreError::Conflict)));

        let updated = store.apply_delta(alice.id, dec!(-10)).await.unwrap();
        assert_eq!(updated.balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_apply_delta_missing_account() {
        let store = MemoryAccountStore::new();
        let result = store.apply_delta(Uuid::new_v4(), dec!(1)).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_user_insert_rejects_duplicate_name() {
        let store = MemoryUserStore::new();
        store.insert(User::new("alice", "h1")).await.unwrap();

        let result = store.insert(User::new("alice", "h2")).await;
        assert!(matches!(result, Err(StoreError::DuplicateName)));
    }
}
