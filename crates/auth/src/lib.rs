//! `wallet-auth` — credential digests and session authentication.
//!
//! Decoupled from HTTP: the transport layer extracts the claim, this crate
//! decides whether it names a real account.

pub mod authenticator;
pub mod signature;

pub use authenticator::{AuthError, Authenticator};
pub use signature::{sign, verify};
