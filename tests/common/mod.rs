//! Common test utilities

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal_macros::dec;

use bank_ledger::api::{create_router, AppState};
use bank_ledger::auth::{
    AccessTokenSigner, Argon2PasswordVerifier, AuthenticationService, TokenService,
};
use bank_ledger::exchange::StaticRateGateway;
use bank_ledger::ledger::LedgerEngine;
use bank_ledger::store::{MemoryAccountStore, MemoryUserStore, UserStore};

/// Build application state over in-memory stores and a fixed-rate
/// exchange gateway. No database required.
pub fn test_state() -> AppState {
    let accounts = Arc::new(MemoryAccountStore::new());
    let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    let rates = Arc::new(StaticRateGateway::new(HashMap::from([
        ("EUR".to_string(), dec!(0.5)),
        ("GBP".to_string(), dec!(0.25)),
    ])));

    let signer = AccessTokenSigner::new(vec![11u8; 32], "bank_ledger", "bank_ledger_clients");

    AppState {
        ledger: LedgerEngine::new(accounts, rates),
        auth: AuthenticationService::new(
            users.clone(),
            Arc::new(Argon2PasswordVerifier::new()),
            TokenService::new(users, signer.clone()),
        ),
        signer,
    }
}

/// Build the full router over [`test_state`].
pub fn test_app() -> axum::Router {
    create_router(test_state())
}
