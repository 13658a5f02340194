use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use wallet_core::{AccountHandle, AccountStore, Money};
use wallet_infra::InMemoryLedgerStore;
use wallet_ledger::{Ledger, LedgerConfig, LedgerError};

fn setup(rt: &Runtime, identified: bool) -> (Arc<Ledger<Arc<InMemoryLedgerStore>>>, AccountHandle) {
    rt.block_on(async {
        let store = Arc::new(InMemoryLedgerStore::new());
        let digest = wallet_auth::sign("bench", "bench");
        let account = store
            .create_account(digest.clone(), Money::ZERO, identified)
            .await
            .unwrap();
        let ledger = Arc::new(Ledger::new(store, LedgerConfig::default()));
        (ledger, AccountHandle::from_verified(account.id, digest))
    })
}

fn bench_replenish(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("replenish_in_memory");

    // Applied path; the balance is reset whenever the identified cap is hit.
    group.bench_function("applied", |b| {
        let (ledger, handle) = setup(&rt, true);
        b.to_async(&rt).iter(|| {
            let ledger = ledger.clone();
            let handle = handle.clone();
            async move {
                match ledger.replenish(&handle, black_box(Money::new(1))).await {
                    Ok(outcome) => {
                        black_box(outcome);
                    }
                    Err(LedgerError::IdentifiedLimitExceeded { .. }) => {
                        ledger
                            .store()
                            .update_balance(handle.account_id(), handle.digest(), Money::ZERO)
                            .await
                            .unwrap();
                    }
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        });
    });

    // Rejected path: unidentified account already at its cap.
    group.bench_function("rejected_unidentified", |b| {
        let (ledger, handle) = setup(&rt, false);
        rt.block_on(ledger.replenish(&handle, Money::new(10_000))).unwrap();
        b.to_async(&rt).iter(|| {
            let ledger = ledger.clone();
            let handle = handle.clone();
            async move {
                let err = ledger.replenish(&handle, black_box(Money::new(1))).await.unwrap_err();
                black_box(err);
            }
        });
    });

    group.finish();
}

fn bench_activity_summary(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("activity_summary_in_memory");

    for history in [10usize, 1_000] {
        let (ledger, handle) = setup(&rt, true);
        rt.block_on(async {
            for _ in 0..history {
                ledger.replenish(&handle, Money::new(1)).await.unwrap();
            }
        });
        group.bench_with_input(BenchmarkId::from_parameter(history), &history, |b, _| {
            b.to_async(&rt).iter(|| {
                let ledger = ledger.clone();
                let handle = handle.clone();
                async move { black_box(ledger.activity_summary(&handle).await.unwrap()) }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_replenish, bench_activity_summary);
criterion_main!(benches);
