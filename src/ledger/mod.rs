//! Ledger engine
//!
//! The only component allowed to mutate account balances. Validation
//! errors are raised before any store I/O, existence errors after one
//! read and before any write, and the two legs of a transfer commit as
//! a single atomic unit in the store. Conflicts reported by the store
//! are retried a bounded number of times; every other error surfaces
//! verbatim.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{
    Account, AccountPage, AccountQuery, Amount, ConvertedBalances, PaginationMetadata,
    TransferDetails,
};
use crate::error::{AppError, AppResult};
use crate::exchange::ExchangeRateGateway;
use crate::store::{AccountStore, StoreError};

const MAX_RETRIES: u32 = 3;

/// Ledger engine over an account store and an exchange-rate gateway.
#[derive(Clone)]
pub struct LedgerEngine {
    accounts: Arc<dyn AccountStore>,
    rates: Arc<dyn ExchangeRateGateway>,
}

impl LedgerEngine {
    pub fn new(accounts: Arc<dyn AccountStore>, rates: Arc<dyn ExchangeRateGateway>) -> Self {
        Self { accounts, rates }
    }

    /// Create an account with a zero balance and a fresh ID.
    pub async fn create(&self, name: &str) -> AppResult<Account> {
        if name.trim().is_empty() {
            return Err(AppError::EmptyName);
        }
        let account = self.accounts.insert(Account::new(name)).await?;
        tracing::info!(account_id = %account.id, "Account created");
        Ok(account)
    }

    /// Fetch an account by ID.
    pub async fn get(&self, id: Uuid) -> AppResult<Account> {
        self.accounts
            .get(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    /// List accounts with filtering, sorting and pagination.
    ///
    /// The total count is computed before paging. When `desc` is set the
    /// paged window itself is reversed rather than the whole result set
    /// being sorted descending; existing clients depend on this
    /// ordering, so it is kept deliberately.
    pub async fn list(&self, query: AccountQuery) -> AppResult<AccountPage> {
        let query = query.normalized();
        let (accounts, total) = self.accounts.list(&query).await?;

        Ok(AccountPage {
            accounts,
            pagination: PaginationMetadata {
                total_item_count: total,
                page_size: query.page_size,
                page_number: query.page_number,
            },
        })
    }

    /// Add funds to an account.
    pub async fn deposit(&self, id: Uuid, amount: Decimal) -> AppResult<Account> {
        let amount = Amount::new(amount).map_err(|_| AppError::NonpositiveAmount)?;

        // Existence is checked with one read before any write.
        if self.accounts.get(id).await?.is_none() {
            return Err(AppError::AccountNotFound(id.to_string()));
        }

        self.accounts
            .apply_delta(id, amount.value())
            .await
            .map_err(|e| delta_error(id, e))
    }

    /// Remove funds from an account, never below zero.
    pub async fn withdraw(&self, id: Uuid, amount: Decimal) -> AppResult<Account> {
        let amount = Amount::new(amount).map_err(|_| AppError::NonpositiveAmount)?;

        for attempt in 0..MAX_RETRIES {
            match self.try_withdraw(id, &amount).await {
                Err(AppError::Conflict) if attempt + 1 < MAX_RETRIES => {
                    backoff(attempt).await;
                }
                other => return other,
            }
        }
        Err(AppError::Conflict)
    }

    async fn try_withdraw(&self, id: Uuid, amount: &Amount) -> AppResult<Account> {
        let account = self
            .accounts
            .get(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))?;

        if amount.value() > account.balance {
            return Err(AppError::InsufficientFunds);
        }

        self.accounts
            .apply_delta(id, -amount.value())
            .await
            .map_err(|e| delta_error(id, e))
    }

    /// Move funds between two accounts as one atomic unit.
    ///
    /// The sender/recipient identity check runs before anything else, so
    /// a transfer between two equal but nonexistent IDs reports
    /// `DuplicateId`, not `AccountNotFound`.
    pub async fn transfer(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        amount: Decimal,
    ) -> AppResult<TransferDetails> {
        if sender_id == recipient_id {
            return Err(AppError::DuplicateId);
        }
        let amount = Amount::new(amount).map_err(|_| AppError::NonpositiveAmount)?;

        for attempt in 0..MAX_RETRIES {
            match self.try_transfer(sender_id, recipient_id, &amount).await {
                Err(AppError::Conflict) if attempt + 1 < MAX_RETRIES => {
                    tracing::warn!(
                        %sender_id,
                        %recipient_id,
                        "Transfer conflict, retrying (attempt {}/{})",
                        attempt + 1,
                        MAX_RETRIES
                    );
                    backoff(attempt).await;
                }
                other => return other,
            }
        }
        Err(AppError::Conflict)
    }

    async fn try_transfer(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        amount: &Amount,
    ) -> AppResult<TransferDetails> {
        let sender = self
            .accounts
            .get(sender_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(sender_id.to_string()))?;

        if self.accounts.get(recipient_id).await?.is_none() {
            return Err(AppError::AccountNotFound(recipient_id.to_string()));
        }

        if amount.value() > sender.balance {
            return Err(AppError::InsufficientFunds);
        }

        match self
            .accounts
            .apply_transfer(sender_id, recipient_id, amount.value())
            .await
        {
            Ok((sender, recipient)) => Ok(TransferDetails { sender, recipient }),
            // A vanished row or a lost balance guard between the reads
            // above and the commit is concurrent mutation; the retry
            // loop re-validates from fresh reads.
            Err(StoreError::NotFound) | Err(StoreError::Conflict) => Err(AppError::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    /// Express an account's balance in each requested currency.
    ///
    /// An empty code list asks the provider for every currency it
    /// supports. Gateway errors propagate with their classification
    /// intact.
    pub async fn convert_balances(
        &self,
        id: Uuid,
        currencies: &[String],
    ) -> AppResult<ConvertedBalances> {
        let account = self
            .accounts
            .get(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))?;

        let rates = self.rates.rates(currencies).await?;

        let converted_balances = rates
            .into_iter()
            .map(|(code, rate)| (code, rate * account.balance))
            .collect();

        Ok(ConvertedBalances {
            id: account.id,
            name: account.name,
            balance: account.balance,
            converted_balances,
        })
    }
}

fn delta_error(id: Uuid, e: StoreError) -> AppError {
    match e {
        StoreError::NotFound => AppError::AccountNotFound(id.to_string()),
        other => other.into(),
    }
}

async fn backoff(attempt: u32) {
    tokio::time::sleep(Duration::from_millis(50 * (u64::from(attempt) + 1))).await;
}
