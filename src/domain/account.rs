//! Account entity
//!
//! A named balance-holding record. Accounts are created with a zero
//! balance and mutated only through the ledger engine; the balance of a
//! persisted account is never negative.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A bank account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    /// Unique account ID
    pub id: Uuid,

    /// Account holder's display name
    pub name: String,

    /// Current balance in home-currency units
    pub balance: Decimal,
}

impl Account {
    /// Create a new account with a fresh ID and a zero balance.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            balance: Decimal::ZERO,
        }
    }
}

/// Both sides of a completed transfer, after the balances moved.
#[derive(Debug, Clone, Serialize)]
pub struct TransferDetails {
    pub sender: Account,
    pub recipient: Account,
}

/// An account's balance expressed in each requested foreign currency.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertedBalances {
    pub id: Uuid,
    pub name: String,
    pub balance: Decimal,
    pub converted_balances: HashMap<String, Decimal>,
}
