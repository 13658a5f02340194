//! The ledger state machine: balance reads, tier-gated replenishment, and
//! monthly activity, all scoped to a verified [`AccountHandle`].
//!
//! ## Replenish pipeline
//!
//! ```text
//! handle + amount
//!   ↓
//! 1. Acquire the per-account lock (serializes same-account replenishments)
//!   ↓
//! 2. Read balance + tier (account must still match the handle's digest)
//!   ↓
//! 3. Evaluate tier policy (rejections return here, nothing written)
//!   ↓
//! 4. Commit balance + history record atomically, conditioned on the balance read in 2
//!   ↓
//! 5. On a lost race (another process moved the balance) re-read and re-evaluate
//! ```
//!
//! Every store call is bounded by `LedgerConfig::store_timeout`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use wallet_core::{
    Account, AccountHandle, AccountId, ActivitySummary, BalanceCommit, LedgerStore, Money,
    MonthWindow, StoreError, TransactionRecord,
};

use crate::clock::{Clock, SystemClock};
use crate::error::LedgerError;
use crate::locks::AccountLocks;
use crate::policy::TierLimits;

/// Tunables for the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Upper bound for any single store call.
    pub store_timeout: Duration,
    /// Upper bound for waiting on another replenishment of the same account.
    pub lock_timeout: Duration,
    /// How many times a conditional commit is attempted before giving up.
    pub max_commit_attempts: u32,
    pub limits: TierLimits,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            lock_timeout: Duration::from_secs(10),
            max_commit_attempts: 3,
            limits: TierLimits::default(),
        }
    }
}

/// Result of an applied replenishment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplenishOutcome {
    pub new_balance: Money,
    pub record: TransactionRecord,
}

/// Balance vs. history comparison for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub balance: Money,
    pub logged_total: Money,
    pub record_count: u64,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.balance == self.logged_total
    }
}

/// Ledger core over an injected store.
#[derive(Debug)]
pub struct Ledger<S> {
    store: S,
    locks: AccountLocks,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl<S> Ledger<S>
where
    S: LedgerStore,
{
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            locks: AccountLocks::new(),
            clock,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Current balance of the handle's account.
    #[instrument(skip_all, fields(account_id = %handle.account_id()))]
    pub async fn balance(&self, handle: &AccountHandle) -> Result<Money, LedgerError> {
        let account = self.load_verified(handle, "get_balance").await?;
        Ok(account.balance)
    }

    /// Whether the handle's account is identified.
    #[instrument(skip_all, fields(account_id = %handle.account_id()))]
    pub async fn identified(&self, handle: &AccountHandle) -> Result<bool, LedgerError> {
        let account = self.load_verified(handle, "get_identified").await?;
        Ok(account.identified)
    }

    /// Add `amount` to the balance if the account's tier allows the result.
    ///
    /// Never retry a failed call blindly: a `Store` error after the commit
    /// reached the backend (e.g. a timeout on the acknowledgement) may still
    /// have applied the amount.
    #[instrument(skip_all, fields(account_id = %handle.account_id(), amount = %amount))]
    pub async fn replenish(
        &self,
        handle: &AccountHandle,
        amount: Money,
    ) -> Result<ReplenishOutcome, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let account_id = handle.account_id();
        let _guard = tokio::time::timeout(self.config.lock_timeout, self.locks.acquire(account_id))
            .await
            .map_err(|_| {
                self.store_failure(
                    account_id,
                    "replenish",
                    StoreError::Timeout {
                        operation: "acquire_account_lock",
                    },
                )
            })?;

        let max_attempts = self.config.max_commit_attempts.max(1);
        let mut attempt = 1;
        loop {
            let account = self.load_verified(handle, "replenish").await?;

            let new_balance = match self.config.limits.evaluate(account.balance, amount, account.identified) {
                Ok(b) => b,
                Err(rejection) => {
                    let err = LedgerError::from(rejection);
                    tracing::info!(balance = %account.balance, reason = %err, "replenishment rejected");
                    return Err(err);
                }
            };

            let commit = BalanceCommit {
                account_id,
                digest: handle.digest().clone(),
                expected_balance: account.balance,
                new_balance,
                amount,
                recorded_at: self.clock.now(),
            };

            match self
                .bounded("commit_replenishment", self.store.commit_replenishment(commit))
                .await
            {
                Ok(record) => {
                    tracing::info!(new_balance = %new_balance, record_id = %record.id, "replenishment applied");
                    return Ok(ReplenishOutcome { new_balance, record });
                }
                Err(StoreError::Conflict(msg)) if attempt < max_attempts => {
                    tracing::warn!(attempt, %msg, "balance moved during replenishment; re-evaluating");
                    attempt += 1;
                }
                Err(StoreError::NotFound) => return Err(LedgerError::NotFound),
                Err(e) => return Err(self.store_failure(account_id, "replenish", e)),
            }
        }
    }

    /// Count and total of this calendar month's records (clock's month).
    #[instrument(skip_all, fields(account_id = %handle.account_id()))]
    pub async fn activity_summary(&self, handle: &AccountHandle) -> Result<ActivitySummary, LedgerError> {
        self.load_verified(handle, "activity_summary").await?;

        let window = MonthWindow::containing(self.clock.now());
        self.bounded(
            "query_monthly",
            self.store.query_monthly(handle.account_id(), window),
        )
        .await
        .map_err(|e| self.store_failure(handle.account_id(), "activity_summary", e))
    }

    /// Compare the stored balance with the sum of the account's history.
    #[instrument(skip_all, fields(account_id = %handle.account_id()))]
    pub async fn reconcile(&self, handle: &AccountHandle) -> Result<Reconciliation, LedgerError> {
        let account_id = handle.account_id();
        let _guard = tokio::time::timeout(self.config.lock_timeout, self.locks.acquire(account_id))
            .await
            .map_err(|_| {
                self.store_failure(
                    account_id,
                    "reconcile",
                    StoreError::Timeout {
                        operation: "acquire_account_lock",
                    },
                )
            })?;

        let account = self.load_verified(handle, "reconcile").await?;
        let records = self
            .bounded("records_for", self.store.records_for(account_id))
            .await
            .map_err(|e| self.store_failure(account_id, "reconcile", e))?;

        let summary = ActivitySummary::from_records(&records);
        let reconciliation = Reconciliation {
            balance: account.balance,
            logged_total: summary.total,
            record_count: summary.count,
        };

        if !reconciliation.is_consistent() {
            tracing::error!(
                balance = %reconciliation.balance,
                logged_total = %reconciliation.logged_total,
                "balance does not match transaction history"
            );
        }
        Ok(reconciliation)
    }

    /// Fetch the account and confirm the handle's digest still matches it.
    async fn load_verified(
        &self,
        handle: &AccountHandle,
        operation: &'static str,
    ) -> Result<Account, LedgerError> {
        let account_id = handle.account_id();
        let account = match self.bounded("find_by_id", self.store.find_by_id(account_id)).await {
            Ok(a) => a,
            Err(StoreError::NotFound) => return Err(LedgerError::NotFound),
            Err(e) => return Err(self.store_failure(account_id, operation, e)),
        };

        if !account.matches_credential(handle.digest()) {
            return Err(LedgerError::NotFound);
        }
        Ok(account)
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.config.store_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout { operation })?
    }

    fn store_failure(&self, account_id: AccountId, operation: &'static str, err: StoreError) -> LedgerError {
        tracing::error!(%account_id, operation, error = %err, "store failure");
        LedgerError::from(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use wallet_core::{
        AccountStore, CredentialDigest, StoreResult, TransactionLog,
    };
    use wallet_infra::InMemoryLedgerStore;

    use crate::clock::FixedClock;

    fn march_2026() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    async fn setup(
        balance: i64,
        identified: bool,
    ) -> (Ledger<Arc<InMemoryLedgerStore>>, AccountHandle, Arc<FixedClock>) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let digest = wallet_auth::sign("alice", "pw");
        let account = store
            .create_account(digest.clone(), Money::new(balance), identified)
            .await
            .unwrap();
        let clock = Arc::new(FixedClock::new(march_2026()));
        let ledger = Ledger::with_clock(store, LedgerConfig::default(), clock.clone());
        (ledger, AccountHandle::from_verified(account.id, digest), clock)
    }

    #[tokio::test]
    async fn scenario_a_unidentified_cap() {
        let (ledger, handle, _) = setup(0, false).await;

        let out = ledger.replenish(&handle, Money::new(9_000)).await.unwrap();
        assert_eq!(out.new_balance, Money::new(9_000));

        let err = ledger.replenish(&handle, Money::new(2_000)).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::UnidentifiedLimitExceeded {
                limit: Money::new(10_000)
            }
        );
        assert_eq!(ledger.balance(&handle).await.unwrap(), Money::new(9_000));
        assert_eq!(ledger.store().records_for(handle.account_id()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn scenario_b_identification_lifts_cap() {
        let (ledger, handle, _) = setup(0, false).await;
        ledger.replenish(&handle, Money::new(9_000)).await.unwrap();

        ledger.store().set_identified(handle.account_id(), true).await.unwrap();
        assert!(ledger.identified(&handle).await.unwrap());

        let out = ledger.replenish(&handle, Money::new(2_000)).await.unwrap();
        assert_eq!(out.new_balance, Money::new(11_000));
    }

    #[tokio::test]
    async fn scenario_c_identified_cap() {
        let (ledger, handle, _) = setup(95_000, true).await;

        let err = ledger.replenish(&handle, Money::new(10_000)).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::IdentifiedLimitExceeded {
                limit: Money::new(100_000)
            }
        );
        assert_eq!(ledger.balance(&handle).await.unwrap(), Money::new(95_000));
        assert!(ledger.store().records_for(handle.account_id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scenario_d_empty_month_is_zero() {
        let (ledger, handle, _) = setup(0, false).await;
        assert_eq!(
            ledger.activity_summary(&handle).await.unwrap(),
            ActivitySummary::EMPTY
        );
    }

    #[tokio::test]
    async fn activity_summary_only_counts_current_month() {
        let (ledger, handle, clock) = setup(0, true).await;

        clock.set(Utc.with_ymd_and_hms(2026, 2, 27, 9, 0, 0).unwrap());
        ledger.replenish(&handle, Money::new(500)).await.unwrap();

        clock.set(march_2026());
        ledger.replenish(&handle, Money::new(1_000)).await.unwrap();
        clock.advance(ChronoDuration::days(3));
        ledger.replenish(&handle, Money::new(250)).await.unwrap();

        let summary = ledger.activity_summary(&handle).await.unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total, Money::new(1_250));

        // Same month, previous year: nothing.
        clock.set(Utc.with_ymd_and_hms(2027, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(ledger.activity_summary(&handle).await.unwrap(), ActivitySummary::EMPTY);
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected_without_effect() {
        let (ledger, handle, _) = setup(100, false).await;

        for amount in [0, -1, -100] {
            let err = ledger.replenish(&handle, Money::new(amount)).await.unwrap_err();
            assert_eq!(err, LedgerError::InvalidAmount(Money::new(amount)));
        }
        assert_eq!(ledger.balance(&handle).await.unwrap(), Money::new(100));
    }

    #[tokio::test]
    async fn stale_or_forged_handles_are_not_found() {
        let (ledger, handle, _) = setup(0, false).await;
        let forged = AccountHandle::from_verified(handle.account_id(), CredentialDigest::new("forged"));
        let missing = AccountHandle::from_verified(AccountId::new(999), handle.digest().clone());

        assert_eq!(ledger.balance(&forged).await.unwrap_err(), LedgerError::NotFound);
        assert_eq!(ledger.balance(&missing).await.unwrap_err(), LedgerError::NotFound);
        assert_eq!(
            ledger.replenish(&forged, Money::new(10)).await.unwrap_err(),
            LedgerError::NotFound
        );
        assert_eq!(ledger.activity_summary(&missing).await.unwrap_err(), LedgerError::NotFound);
    }

    #[tokio::test]
    async fn history_reconciles_with_balance() {
        let (ledger, handle, _) = setup(0, true).await;
        for amount in [1_000, 2_500, 7, 40_000] {
            ledger.replenish(&handle, Money::new(amount)).await.unwrap();
        }
        let _ = ledger.replenish(&handle, Money::new(90_000)).await.unwrap_err();

        let rec = ledger.reconcile(&handle).await.unwrap();
        assert!(rec.is_consistent());
        assert_eq!(rec.record_count, 4);
        assert_eq!(rec.balance, Money::new(43_507));
    }

    #[tokio::test]
    async fn account_locks_are_dropped_after_each_operation() {
        let (ledger, handle, _) = setup(0, false).await;

        ledger.replenish(&handle, Money::new(100)).await.unwrap();
        let _ = ledger.replenish(&handle, Money::new(50_000)).await.unwrap_err();
        ledger.reconcile(&handle).await.unwrap();

        assert_eq!(ledger.locks.tracked(), 0);
    }

    /// Store wrapper that can fail or stall the commit step.
    struct FlakyStore {
        inner: InMemoryLedgerStore,
        mode: CommitMode,
    }

    enum CommitMode {
        Fail(StoreError),
        /// Move the balance behind the ledger's back before every commit.
        Interfere,
        Stall,
    }

    #[async_trait]
    impl AccountStore for FlakyStore {
        async fn find_by_credential(&self, digest: &CredentialDigest) -> StoreResult<Account> {
            self.inner.find_by_credential(digest).await
        }
        async fn find_by_id(&self, id: AccountId) -> StoreResult<Account> {
            self.inner.find_by_id(id).await
        }
        async fn update_balance(&self, id: AccountId, digest: &CredentialDigest, b: Money) -> StoreResult<()> {
            self.inner.update_balance(id, digest, b).await
        }
        async fn create_account(&self, digest: CredentialDigest, b: Money, identified: bool) -> StoreResult<Account> {
            self.inner.create_account(digest, b, identified).await
        }
        async fn set_identified(&self, id: AccountId, identified: bool) -> StoreResult<()> {
            self.inner.set_identified(id, identified).await
        }
    }

    #[async_trait]
    impl TransactionLog for FlakyStore {
        async fn append(&self, id: AccountId, amount: Money, at: DateTime<Utc>) -> StoreResult<TransactionRecord> {
            self.inner.append(id, amount, at).await
        }
        async fn query_monthly(&self, id: AccountId, window: MonthWindow) -> StoreResult<ActivitySummary> {
            self.inner.query_monthly(id, window).await
        }
        async fn records_for(&self, id: AccountId) -> StoreResult<Vec<TransactionRecord>> {
            self.inner.records_for(id).await
        }
    }

    #[async_trait]
    impl LedgerStore for FlakyStore {
        async fn commit_replenishment(&self, commit: BalanceCommit) -> StoreResult<TransactionRecord> {
            match &self.mode {
                CommitMode::Fail(e) => Err(e.clone()),
                CommitMode::Interfere => {
                    let bumped = Money::new(commit.expected_balance.units() + 1);
                    self.inner
                        .update_balance(commit.account_id, &commit.digest, bumped)
                        .await?;
                    self.inner.commit_replenishment(commit).await
                }
                CommitMode::Stall => {
                    tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                    self.inner.commit_replenishment(commit).await
                }
            }
        }
    }

    async fn flaky(mode: CommitMode, config: LedgerConfig) -> (Ledger<FlakyStore>, AccountHandle) {
        let inner = InMemoryLedgerStore::new();
        let digest = wallet_auth::sign("bob", "pw");
        let account = inner.create_account(digest.clone(), Money::ZERO, false).await.unwrap();
        let ledger = Ledger::new(FlakyStore { inner, mode }, config);
        (ledger, AccountHandle::from_verified(account.id, digest))
    }

    #[tokio::test]
    async fn commit_failure_surfaces_store_error_and_writes_nothing() {
        let (ledger, handle) = flaky(
            CommitMode::Fail(StoreError::backend("commit_replenishment", "disk full")),
            LedgerConfig::default(),
        )
        .await;

        let err = ledger.replenish(&handle, Money::new(100)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Store(StoreError::Backend { .. })));
        assert_eq!(ledger.balance(&handle).await.unwrap(), Money::ZERO);
        assert!(ledger.store().records_for(handle.account_id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn persistent_conflicts_give_up_after_max_attempts() {
        let config = LedgerConfig {
            max_commit_attempts: 2,
            ..LedgerConfig::default()
        };
        let (ledger, handle) = flaky(CommitMode::Interfere, config).await;

        let err = ledger.replenish(&handle, Money::new(100)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Store(StoreError::Conflict(_))));
        // Only the interfering writes landed; no record for the lost attempts.
        assert!(ledger.store().records_for(handle.account_id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stalled_commit_times_out_without_applying() {
        let config = LedgerConfig {
            store_timeout: std::time::Duration::from_millis(100),
            ..LedgerConfig::default()
        };
        let (ledger, handle) = flaky(CommitMode::Stall, config).await;

        let err = ledger.replenish(&handle, Money::new(100)).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::Store(StoreError::Timeout {
                operation: "commit_replenishment"
            })
        );
        assert_eq!(ledger.balance(&handle).await.unwrap(), Money::ZERO);
        assert!(ledger.store().records_for(handle.account_id()).await.unwrap().is_empty());
    }
}
