//! bank_ledger Library
//!
//! Bank-account backend: a ledger engine enforcing balance invariants,
//! a refresh-token rotation engine, and the thin HTTP surface around
//! them. Re-exports modules for integration testing and external use.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod ledger;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};

pub use auth::{AuthenticationService, TokenService};
pub use domain::{Account, AccountQuery, Amount, PaginationMetadata, SortKey, User};
pub use ledger::LedgerEngine;
