//! Postgres-backed ledger store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | StoreError | Scenario |
//! |------------|-----------------|------------|----------|
//! | Database (unique violation) | `23505` | `Duplicate` | Credential digest already provisioned |
//! | Database (foreign key violation) | `23503` | `NotFound` | Record for an unknown account |
//! | Database (check violation) | `23514` | `Backend` | Negative balance |
//! | Database (other) | any | `Backend` | |
//! | RowNotFound | N/A | `NotFound` | |
//! | PoolClosed / Io / Tls / other | N/A | `Backend` | Connection failures |
//!
//! ## Atomicity
//!
//! `commit_replenishment` runs the conditional balance update and the history
//! insert in one transaction. A `sqlx::Transaction` that is dropped before
//! `commit()` rolls back, so a cancelled (timed-out) commit leaves nothing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use wallet_core::{
    Account, AccountId, AccountStore, ActivitySummary, BalanceCommit, CredentialDigest,
    LedgerStore, MonthWindow, Money, RecordId, StoreError, StoreResult, TransactionLog,
    TransactionRecord,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id BIGSERIAL PRIMARY KEY,
        credential_digest VARCHAR(100) NOT NULL UNIQUE,
        balance BIGINT NOT NULL CHECK (balance >= 0),
        identified BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id BIGSERIAL PRIMARY KEY,
        account_id BIGINT NOT NULL REFERENCES accounts(id),
        amount BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS transactions_account_created_idx
        ON transactions (account_id, created_at)
    "#,
];

/// Postgres-backed ledger store.
///
/// Thread-safe: all access goes through the SQLx pool.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn provision_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("provision_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PostgresLedgerStore {
    #[instrument(skip_all, fields(operation = "find_by_credential"), err)]
    async fn find_by_credential(&self, digest: &CredentialDigest) -> StoreResult<Account> {
        let row = sqlx::query(
            r#"
            SELECT id, credential_digest, balance, identified
            FROM accounts
            WHERE credential_digest = $1
            "#,
        )
        .bind(digest.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_credential", e))?
        .ok_or(StoreError::NotFound)?;

        decode_account("find_by_credential", &row)
    }

    #[instrument(skip(self), fields(operation = "find_by_id"), err)]
    async fn find_by_id(&self, id: AccountId) -> StoreResult<Account> {
        let row = sqlx::query(
            r#"
            SELECT id, credential_digest, balance, identified
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_id", e))?
        .ok_or(StoreError::NotFound)?;

        decode_account("find_by_id", &row)
    }

    #[instrument(skip(self, digest), fields(operation = "update_balance"), err)]
    async fn update_balance(
        &self,
        id: AccountId,
        digest: &CredentialDigest,
        new_balance: Money,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE accounts SET balance = $1 WHERE id = $2 AND credential_digest = $3",
        )
        .bind(new_balance.units())
        .bind(id.get())
        .bind(digest.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_balance", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, digest), fields(operation = "create_account"), err)]
    async fn create_account(
        &self,
        digest: CredentialDigest,
        balance: Money,
        identified: bool,
    ) -> StoreResult<Account> {
        let row = sqlx::query(
            r#"
            INSERT INTO accounts (credential_digest, balance, identified)
            VALUES ($1, $2, $3)
            RETURNING id, credential_digest, balance, identified
            "#,
        )
        .bind(digest.as_str())
        .bind(balance.units())
        .bind(identified)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_account", e))?;

        decode_account("create_account", &row)
    }

    #[instrument(skip(self), fields(operation = "set_identified"), err)]
    async fn set_identified(&self, id: AccountId, identified: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE accounts SET identified = $1 WHERE id = $2")
            .bind(identified)
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_identified", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionLog for PostgresLedgerStore {
    #[instrument(skip(self), fields(operation = "append"), err)]
    async fn append(
        &self,
        account_id: AccountId,
        amount: Money,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<TransactionRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (account_id, amount, created_at)
            VALUES (
                $1,
                $2,
                GREATEST(
                    $3,
                    COALESCE(
                        (SELECT MAX(created_at) FROM transactions WHERE account_id = $1),
                        $3
                    )
                )
            )
            RETURNING id, account_id, amount, created_at
            "#,
        )
        .bind(account_id.get())
        .bind(amount.units())
        .bind(recorded_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append", e))?;

        decode_record("append", &row)
    }

    #[instrument(skip(self), fields(operation = "query_monthly"), err)]
    async fn query_monthly(
        &self,
        account_id: AccountId,
        window: MonthWindow,
    ) -> StoreResult<ActivitySummary> {
        let (start, end) = window.bounds().ok_or_else(|| {
            StoreError::backend(
                "query_monthly",
                format!("invalid month {}-{}", window.year, window.month),
            )
        })?;

        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count, COALESCE(SUM(amount), 0)::BIGINT AS total
            FROM transactions
            WHERE account_id = $1 AND created_at >= $2 AND created_at < $3
            "#,
        )
        .bind(account_id.get())
        .bind(start)
        .bind(end)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_monthly", e))?;

        let count: i64 = row
            .try_get("count")
            .map_err(|e| map_sqlx_error("query_monthly", e))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| map_sqlx_error("query_monthly", e))?;

        Ok(ActivitySummary {
            count: u64::try_from(count).unwrap_or_default(),
            total: Money::new(total),
        })
    }

    #[instrument(skip(self), fields(operation = "records_for"), err)]
    async fn records_for(&self, account_id: AccountId) -> StoreResult<Vec<TransactionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, amount, created_at
            FROM transactions
            WHERE account_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(account_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("records_for", e))?;

        rows.iter().map(|row| decode_record("records_for", row)).collect()
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    /// Conditional update + insert in one transaction.
    ///
    /// Under READ COMMITTED a concurrent writer holding the row blocks the
    /// `UPDATE` until it finishes, after which the `balance = $4` predicate is
    /// re-checked against the committed value. Zero affected rows therefore
    /// means the pair is unknown or the balance moved.
    #[instrument(
        skip(self, commit),
        fields(
            operation = "commit_replenishment",
            account_id = %commit.account_id,
            amount = %commit.amount
        ),
        err
    )]
    async fn commit_replenishment(&self, commit: BalanceCommit) -> StoreResult<TransactionRecord> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("commit_replenishment", e))?;

        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $1
            WHERE id = $2 AND credential_digest = $3 AND balance = $4
            "#,
        )
        .bind(commit.new_balance.units())
        .bind(commit.account_id.get())
        .bind(commit.digest.as_str())
        .bind(commit.expected_balance.units())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("commit_replenishment", e))?;

        if updated.rows_affected() == 0 {
            let current: Option<i64> = sqlx::query_scalar(
                "SELECT balance FROM accounts WHERE id = $1 AND credential_digest = $2",
            )
            .bind(commit.account_id.get())
            .bind(commit.digest.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("commit_replenishment", e))?;

            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("commit_replenishment", e))?;

            return Err(match current {
                None => StoreError::NotFound,
                Some(found) => StoreError::conflict(format!(
                    "expected balance {}, found {found}",
                    commit.expected_balance
                )),
            });
        }

        // The UPDATE above holds the account row lock, so the latest record
        // can't move under us; clamp to it so history never goes backwards.
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (account_id, amount, created_at)
            VALUES (
                $1,
                $2,
                GREATEST(
                    $3,
                    COALESCE(
                        (SELECT MAX(created_at) FROM transactions WHERE account_id = $1),
                        $3
                    )
                )
            )
            RETURNING id, account_id, amount, created_at
            "#,
        )
        .bind(commit.account_id.get())
        .bind(commit.amount.units())
        .bind(commit.recorded_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("commit_replenishment", e))?;
        let record = decode_record("commit_replenishment", &row)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_replenishment", e))?;

        Ok(record)
    }
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = db_err.message().to_string();
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                Some("23503") => StoreError::NotFound,
                _ => StoreError::backend(operation, msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolClosed => StoreError::backend(operation, "connection pool closed"),
        sqlx::Error::PoolTimedOut => StoreError::backend(operation, "timed out acquiring a connection"),
        other => StoreError::backend(operation, other.to_string()),
    }
}

// SQLx row types

#[derive(Debug)]
struct AccountRow {
    id: i64,
    credential_digest: String,
    balance: i64,
    identified: bool,
}

impl<'r> FromRow<'r, PgRow> for AccountRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccountRow {
            id: row.try_get("id")?,
            credential_digest: row.try_get("credential_digest")?,
            balance: row.try_get("balance")?,
            identified: row.try_get("identified")?,
        })
    }
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: AccountId::new(row.id),
            credential_digest: CredentialDigest::new(row.credential_digest),
            balance: Money::new(row.balance),
            identified: row.identified,
        }
    }
}

#[derive(Debug)]
struct RecordRow {
    id: i64,
    account_id: i64,
    amount: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for RecordRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(RecordRow {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            amount: row.try_get("amount")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<RecordRow> for TransactionRecord {
    fn from(row: RecordRow) -> Self {
        TransactionRecord {
            id: RecordId::new(row.id),
            account_id: AccountId::new(row.account_id),
            amount: Money::new(row.amount),
            recorded_at: row.created_at,
        }
    }
}

fn decode_account(operation: &'static str, row: &PgRow) -> StoreResult<Account> {
    AccountRow::from_row(row)
        .map(Account::from)
        .map_err(|e| StoreError::backend(operation, format!("failed to decode account row: {e}")))
}

fn decode_record(operation: &'static str, row: &PgRow) -> StoreResult<TransactionRecord> {
    RecordRow::from_row(row)
        .map(TransactionRecord::from)
        .map_err(|e| StoreError::backend(operation, format!("failed to decode transaction row: {e}")))
}
