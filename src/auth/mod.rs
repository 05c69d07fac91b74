//! Authentication
//!
//! Password verification, access-token signing and the refresh-token
//! rotation engine, composed by a thin facade.

pub mod password;
pub mod service;
pub mod token;

pub use password::{Argon2PasswordVerifier, PasswordVerifier};
pub use service::AuthenticationService;
pub use token::{AccessTokenSigner, Claims, TokenPair, TokenService};
