//! Session authenticator: identity claim → verified [`AccountHandle`].

use thiserror::Error;
use tracing::instrument;

use wallet_core::{AccountHandle, AccountId, AccountStore, CredentialDigest, StoreError};

use crate::signature;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No account matches the credential, or the digest does not match the id.
    #[error("account not found")]
    NotFound,

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => AuthError::NotFound,
            other => AuthError::Store(other),
        }
    }
}

/// Maps login/password pairs and id/digest claims to verified handles.
///
/// Stateless apart from the injected store; cheap to clone when `S` is.
#[derive(Debug, Clone)]
pub struct Authenticator<S> {
    store: S,
}

impl<S> Authenticator<S>
where
    S: AccountStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Derive the digest from `login`/`password` and resolve the account it names.
    #[instrument(skip_all, err(level = "debug"))]
    pub async fn login(&self, login: &str, password: &str) -> Result<AccountHandle, AuthError> {
        let digest = signature::sign(login, password);
        let account = self.store.find_by_credential(&digest).await?;

        // The store matched on the digest; re-check so a sloppy backend can't
        // hand out someone else's account.
        if !account.matches_credential(&digest) {
            return Err(AuthError::NotFound);
        }

        tracing::debug!(account_id = %account.id, "login resolved account");
        Ok(AccountHandle::from_verified(account.id, digest))
    }

    /// Check that `presented` is the stored digest of account `id`.
    #[instrument(skip(self, presented), fields(account_id = %id), err(level = "debug"))]
    pub async fn authenticate(
        &self,
        id: AccountId,
        presented: &CredentialDigest,
    ) -> Result<AccountHandle, AuthError> {
        let account = self.store.find_by_id(id).await?;

        if !account.matches_credential(presented) {
            return Err(AuthError::NotFound);
        }

        Ok(AccountHandle::from_verified(account.id, presented.clone()))
    }
}
