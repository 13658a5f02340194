//! Request-scoped proof of identity.

use crate::{AccountId, CredentialDigest};

/// Verified account handle.
///
/// Produced by the session authenticator after the presented digest matched the
/// stored one. Every ledger operation takes it explicitly; it is never
/// persisted and should not outlive the request that created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountHandle {
    account_id: AccountId,
    digest: CredentialDigest,
}

impl AccountHandle {
    /// Wrap an id + digest pair that has ALREADY been checked against the store.
    ///
    /// Only the authenticator and provisioning code should call this.
    pub fn from_verified(account_id: AccountId, digest: CredentialDigest) -> Self {
        Self { account_id, digest }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn digest(&self) -> &CredentialDigest {
        &self.digest
    }
}
