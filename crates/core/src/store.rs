//! Storage ports consumed by the authenticator and the ledger.
//!
//! Implementations live in `wallet-infra` (in-memory for dev/tests, Postgres
//! for deployments). The traits make no storage assumptions beyond the
//! atomicity contract spelled out on [`LedgerStore::commit_replenishment`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Account, AccountId, ActivitySummary, BalanceCommit, CredentialDigest, MonthWindow, Money,
    StoreResult, TransactionRecord,
};

/// Durable account records: identity, balance, tier.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look an account up by its credential digest (`StoreError::NotFound` if none).
    async fn find_by_credential(&self, digest: &CredentialDigest) -> StoreResult<Account>;

    /// Look an account up by id (`StoreError::NotFound` if none).
    async fn find_by_id(&self, id: AccountId) -> StoreResult<Account>;

    /// Unconditionally overwrite the balance of the account matching BOTH `id`
    /// and `digest`. `StoreError::NotFound` if no row matches the pair.
    async fn update_balance(
        &self,
        id: AccountId,
        digest: &CredentialDigest,
        new_balance: Money,
    ) -> StoreResult<()>;

    /// Provision a new account. `StoreError::Duplicate` if the digest is taken.
    async fn create_account(
        &self,
        digest: CredentialDigest,
        balance: Money,
        identified: bool,
    ) -> StoreResult<Account>;

    /// Change the identification tier of an account.
    async fn set_identified(&self, id: AccountId, identified: bool) -> StoreResult<()>;
}

/// Append-only history of balance-affecting events.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Append one record; the log assigns the record id.
    async fn append(
        &self,
        account_id: AccountId,
        amount: Money,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<TransactionRecord>;

    /// Count and sum an account's records in a calendar month. Empty → `(0, 0)`.
    async fn query_monthly(
        &self,
        account_id: AccountId,
        window: MonthWindow,
    ) -> StoreResult<ActivitySummary>;

    /// Every record of an account, oldest first.
    async fn records_for(&self, account_id: AccountId) -> StoreResult<Vec<TransactionRecord>>;
}

/// A store that can apply a balance write and its history record as one unit.
#[async_trait]
pub trait LedgerStore: AccountStore + TransactionLog {
    /// Atomically apply `commit`:
    /// - the account row matching `account_id` + `digest` must still hold
    ///   `expected_balance`, else `StoreError::Conflict` (or `NotFound` when the
    ///   pair matches nothing) and nothing is written;
    /// - on success the balance becomes `new_balance` and exactly one record is
    ///   appended, both visible together or not at all.
    async fn commit_replenishment(&self, commit: BalanceCommit) -> StoreResult<TransactionRecord>;
}

#[async_trait]
impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    async fn find_by_credential(&self, digest: &CredentialDigest) -> StoreResult<Account> {
        (**self).find_by_credential(digest).await
    }

    async fn find_by_id(&self, id: AccountId) -> StoreResult<Account> {
        (**self).find_by_id(id).await
    }

    async fn update_balance(
        &self,
        id: AccountId,
        digest: &CredentialDigest,
        new_balance: Money,
    ) -> StoreResult<()> {
        (**self).update_balance(id, digest, new_balance).await
    }

    async fn create_account(
        &self,
        digest: CredentialDigest,
        balance: Money,
        identified: bool,
    ) -> StoreResult<Account> {
        (**self).create_account(digest, balance, identified).await
    }

    async fn set_identified(&self, id: AccountId, identified: bool) -> StoreResult<()> {
        (**self).set_identified(id, identified).await
    }
}

#[async_trait]
impl<S> TransactionLog for Arc<S>
where
    S: TransactionLog + ?Sized,
{
    async fn append(
        &self,
        account_id: AccountId,
        amount: Money,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<TransactionRecord> {
        (**self).append(account_id, amount, recorded_at).await
    }

    async fn query_monthly(
        &self,
        account_id: AccountId,
        window: MonthWindow,
    ) -> StoreResult<ActivitySummary> {
        (**self).query_monthly(account_id, window).await
    }

    async fn records_for(&self, account_id: AccountId) -> StoreResult<Vec<TransactionRecord>> {
        (**self).records_for(account_id).await
    }
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn commit_replenishment(&self, commit: BalanceCommit) -> StoreResult<TransactionRecord> {
        (**self).commit_replenishment(commit).await
    }
}
