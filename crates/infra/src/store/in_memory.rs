use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use wallet_core::{
    Account, AccountId, AccountStore, ActivitySummary, BalanceCommit, CredentialDigest,
    LedgerStore, MonthWindow, Money, RecordId, StoreError, StoreResult, TransactionLog,
    TransactionRecord,
};

#[derive(Debug, Default)]
struct State {
    accounts: BTreeMap<AccountId, Account>,
    by_digest: HashMap<CredentialDigest, AccountId>,
    /// Per-account history, oldest first, timestamps non-decreasing.
    history: HashMap<AccountId, Vec<TransactionRecord>>,
    last_account_id: i64,
    last_record_id: i64,
}

impl State {
    /// Account matching both id and digest.
    fn account_mut(&mut self, id: AccountId, digest: &CredentialDigest) -> StoreResult<&mut Account> {
        match self.accounts.get_mut(&id) {
            Some(account) if account.matches_credential(digest) => Ok(account),
            _ => Err(StoreError::NotFound),
        }
    }

    /// Push a record, keeping per-account timestamps non-decreasing.
    fn push_record(
        &mut self,
        account_id: AccountId,
        amount: Money,
        recorded_at: DateTime<Utc>,
    ) -> TransactionRecord {
        self.last_record_id += 1;
        let history = self.history.entry(account_id).or_default();
        let recorded_at = match history.last() {
            Some(last) if last.recorded_at > recorded_at => last.recorded_at,
            _ => recorded_at,
        };

        let record = TransactionRecord {
            id: RecordId::new(self.last_record_id),
            account_id,
            amount,
            recorded_at,
        };
        history.push(record.clone());
        record
    }
}

/// In-memory ledger store.
///
/// Intended for tests/dev. Accounts, digests and history share one lock, so a
/// commit's balance write and record append are observed together.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<State>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, operation: &'static str) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::backend(operation, "lock poisoned"))
    }

    fn write(&self, operation: &'static str) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::backend(operation, "lock poisoned"))
    }
}

fn reject_negative(operation: &'static str, balance: Money) -> StoreResult<()> {
    if balance.units() < 0 {
        return Err(StoreError::backend(
            operation,
            format!("refusing to persist negative balance {balance}"),
        ));
    }
    Ok(())
}

#[async_trait]
impl AccountStore for InMemoryLedgerStore {
    async fn find_by_credential(&self, digest: &CredentialDigest) -> StoreResult<Account> {
        let state = self.read("find_by_credential")?;
        state
            .by_digest
            .get(digest)
            .and_then(|id| state.accounts.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_id(&self, id: AccountId) -> StoreResult<Account> {
        let state = self.read("find_by_id")?;
        state.accounts.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update_balance(
        &self,
        id: AccountId,
        digest: &CredentialDigest,
        new_balance: Money,
    ) -> StoreResult<()> {
        reject_negative("update_balance", new_balance)?;
        let mut state = self.write("update_balance")?;
        state.account_mut(id, digest)?.balance = new_balance;
        Ok(())
    }

    async fn create_account(
        &self,
        digest: CredentialDigest,
        balance: Money,
        identified: bool,
    ) -> StoreResult<Account> {
        reject_negative("create_account", balance)?;
        let mut state = self.write("create_account")?;
        if state.by_digest.contains_key(&digest) {
            return Err(StoreError::duplicate("credential digest already provisioned"));
        }

        state.last_account_id += 1;
        let account = Account {
            id: AccountId::new(state.last_account_id),
            credential_digest: digest.clone(),
            balance,
            identified,
        };
        let id = account.id;
        state.by_digest.insert(digest, id);
        state.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn set_identified(&self, id: AccountId, identified: bool) -> StoreResult<()> {
        let mut state = self.write("set_identified")?;
        let account = state.accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.identified = identified;
        Ok(())
    }
}

#[async_trait]
impl TransactionLog for InMemoryLedgerStore {
    async fn append(
        &self,
        account_id: AccountId,
        amount: Money,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<TransactionRecord> {
        let mut state = self.write("append")?;
        if !state.accounts.contains_key(&account_id) {
            return Err(StoreError::NotFound);
        }
        Ok(state.push_record(account_id, amount, recorded_at))
    }

    async fn query_monthly(
        &self,
        account_id: AccountId,
        window: MonthWindow,
    ) -> StoreResult<ActivitySummary> {
        let state = self.read("query_monthly")?;
        let Some(history) = state.history.get(&account_id) else {
            return Ok(ActivitySummary::EMPTY);
        };
        let Some((start, end)) = window.bounds() else {
            return Err(StoreError::backend(
                "query_monthly",
                format!("invalid month {}-{}", window.year, window.month),
            ));
        };

        let from = history.partition_point(|r| r.recorded_at < start);
        let to = history.partition_point(|r| r.recorded_at < end);
        Ok(ActivitySummary::from_records(&history[from..to]))
    }

    async fn records_for(&self, account_id: AccountId) -> StoreResult<Vec<TransactionRecord>> {
        let state = self.read("records_for")?;
        Ok(state.history.get(&account_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn commit_replenishment(&self, commit: BalanceCommit) -> StoreResult<TransactionRecord> {
        reject_negative("commit_replenishment", commit.new_balance)?;
        if commit.expected_balance.checked_add(commit.amount) != Some(commit.new_balance) {
            return Err(StoreError::backend(
                "commit_replenishment",
                format!(
                    "new balance {} is not {} + {}",
                    commit.new_balance, commit.expected_balance, commit.amount
                ),
            ));
        }

        let mut state = self.write("commit_replenishment")?;
        let account = state.account_mut(commit.account_id, &commit.digest)?;
        if account.balance != commit.expected_balance {
            return Err(StoreError::conflict(format!(
                "expected balance {}, found {}",
                commit.expected_balance, account.balance
            )));
        }
        account.balance = commit.new_balance;

        Ok(state.push_record(commit.account_id, commit.amount, commit.recorded_at))
    }
}
