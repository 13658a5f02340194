//! Per-account mutual exclusion for read-evaluate-commit sequences.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use wallet_core::AccountId;

/// One async mutex per account id, created on first use and dropped once
/// nobody holds or waits on it.
///
/// Operations on different accounts never contend; operations on the same
/// account run one at a time in lock-acquisition (FIFO) order.
#[derive(Debug, Default)]
pub struct AccountLocks {
    inner: Mutex<HashMap<AccountId, Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Released when the guard drops.
    pub async fn acquire(&self, id: AccountId) -> AccountGuard<'_> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            map.entry(id).or_default().clone()
        };
        AccountGuard {
            locks: self,
            id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Forget `id`'s mutex if the map holds the only reference to it.
    fn release(&self, id: AccountId) {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if map.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            map.remove(&id);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

/// Exclusive access to one account.
#[derive(Debug)]
pub struct AccountGuard<'a> {
    locks: &'a AccountLocks,
    id: AccountId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AccountGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so our own Arc no longer counts.
        self.guard.take();
        self.locks.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_account_is_exclusive() {
        let locks = AccountLocks::new();
        let id = AccountId::new(1);

        let guard = locks.acquire(id).await;
        let second = tokio::time::timeout(Duration::from_millis(20), locks.acquire(id)).await;
        assert!(second.is_err(), "second acquire must wait while the first guard lives");

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(200), locks.acquire(id)).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn different_accounts_do_not_contend() {
        let locks = AccountLocks::new();
        let _a = locks.acquire(AccountId::new(1)).await;
        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire(AccountId::new(2))).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn released_locks_are_forgotten() {
        let locks = AccountLocks::new();
        let held = locks.acquire(AccountId::new(1)).await;
        drop(locks.acquire(AccountId::new(2)).await);
        assert_eq!(locks.tracked(), 1);

        drop(held);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn waiter_keeps_entry_alive_after_holder_releases() {
        let locks = Arc::new(AccountLocks::new());
        let id = AccountId::new(7);
        let held = locks.acquire(id).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
                locks.tracked()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        // The waiter got the same mutex rather than a fresh one.
        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(locks.tracked(), 0);
    }
}
