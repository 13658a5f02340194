//! Same-account replenishments racing on a multi-threaded runtime.

use std::sync::Arc;

use wallet_core::{AccountHandle, AccountStore, Money, TransactionLog};
use wallet_infra::InMemoryLedgerStore;
use wallet_ledger::{Ledger, LedgerConfig, LedgerError};

async fn ledger_with_account(
    identified: bool,
) -> (Arc<Ledger<Arc<InMemoryLedgerStore>>>, AccountHandle) {
    let store = Arc::new(InMemoryLedgerStore::new());
    let digest = wallet_auth::sign("carol", "secret");
    let account = store
        .create_account(digest.clone(), Money::ZERO, identified)
        .await
        .unwrap();
    let ledger = Arc::new(Ledger::new(store, LedgerConfig::default()));
    (ledger, AccountHandle::from_verified(account.id, digest))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_replenishments_are_not_lost() {
    let (ledger, handle) = ledger_with_account(true).await;

    let tasks: Vec<_> = (1..=50)
        .map(|i| {
            let ledger = ledger.clone();
            let handle = handle.clone();
            tokio::spawn(async move { ledger.replenish(&handle, Money::new(i)).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let expected: i64 = (1..=50).sum();
    assert_eq!(ledger.balance(&handle).await.unwrap(), Money::new(expected));

    let records = ledger.store().records_for(handle.account_id()).await.unwrap();
    assert_eq!(records.len(), 50);
    assert!(ledger.reconcile(&handle).await.unwrap().is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn racing_past_the_cap_admits_exactly_what_fits() {
    let (ledger, handle) = ledger_with_account(false).await;

    // 30 x 500 = 15,000 requested against a 10,000 cap: exactly 20 fit.
    let tasks: Vec<_> = (0..30)
        .map(|_| {
            let ledger = ledger.clone();
            let handle = handle.clone();
            tokio::spawn(async move { ledger.replenish(&handle, Money::new(500)).await })
        })
        .collect();

    let mut applied = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => applied += 1,
            Err(LedgerError::UnidentifiedLimitExceeded { .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(applied, 20);
    assert_eq!(rejected, 10);
    assert_eq!(ledger.balance(&handle).await.unwrap(), Money::new(10_000));
    assert!(ledger.reconcile(&handle).await.unwrap().is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_ledgers_sharing_a_store_stay_consistent() {
    // Separate lock tables, shared store: only the conditional commit keeps
    // them from overwriting each other.
    let store = Arc::new(InMemoryLedgerStore::new());
    let digest = wallet_auth::sign("dave", "pw");
    let account = store
        .create_account(digest.clone(), Money::ZERO, true)
        .await
        .unwrap();
    let handle = AccountHandle::from_verified(account.id, digest);

    let config = LedgerConfig {
        max_commit_attempts: 1_000,
        ..LedgerConfig::default()
    };
    let a = Arc::new(Ledger::new(store.clone(), config));
    let b = Arc::new(Ledger::new(store.clone(), config));

    let mut tasks = Vec::new();
    for i in 0..40 {
        let ledger = if i % 2 == 0 { a.clone() } else { b.clone() };
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move { ledger.replenish(&handle, Money::new(10)).await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(a.balance(&handle).await.unwrap(), Money::new(400));
    assert_eq!(store.records_for(handle.account_id()).await.unwrap().len(), 40);
}
