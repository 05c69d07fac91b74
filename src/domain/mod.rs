//! Domain model
//!
//! Entities and value types shared by the ledger and authentication
//! engines. Nothing here performs I/O.

pub mod account;
pub mod amount;
pub mod query;
pub mod user;

pub use account::{Account, ConvertedBalances, TransferDetails};
pub use amount::{Amount, AmountError};
pub use query::{AccountPage, AccountQuery, PaginationMetadata, SortKey};
pub use user::User;
