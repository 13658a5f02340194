//! `wallet-core` — domain foundation for the tiered wallet ledger.
//!
//! Pure domain types plus the storage ports the ledger and authenticator are
//! written against. No IO lives here.

pub mod account;
pub mod credential;
pub mod error;
pub mod handle;
pub mod id;
pub mod money;
pub mod record;
pub mod store;

pub use account::Account;
pub use credential::CredentialDigest;
pub use error::{StoreError, StoreResult};
pub use handle::AccountHandle;
pub use id::{AccountId, RecordId};
pub use money::Money;
pub use record::{ActivitySummary, BalanceCommit, MonthWindow, TransactionRecord};
pub use store::{AccountStore, LedgerStore, TransactionLog};
