use wallet_core::{AccountHandle, AccountId};

/// Authenticated account for a request.
///
/// Inserted by the auth middleware and required by every wallet route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    handle: AccountHandle,
}

impl AccountContext {
    pub fn new(handle: AccountHandle) -> Self {
        Self { handle }
    }

    pub fn account_id(&self) -> AccountId {
        self.handle.account_id()
    }

    pub fn handle(&self) -> &AccountHandle {
        &self.handle
    }
}
