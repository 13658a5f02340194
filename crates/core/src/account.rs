//! Provisioned accounts.

use crate::{AccountId, CredentialDigest, Money};

/// A provisioned account.
///
/// # Invariants
/// - `id` never changes.
/// - `credential_digest` is unique across accounts.
/// - `balance` is never persisted negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub credential_digest: CredentialDigest,
    pub balance: Money,
    pub identified: bool,
}

impl Account {
    /// True when `presented` matches the stored digest (constant-time).
    pub fn matches_credential(&self, presented: &CredentialDigest) -> bool {
        self.credential_digest.ct_eq(presented)
    }
}
