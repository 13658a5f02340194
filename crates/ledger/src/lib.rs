//! Ledger core: tier-limited balance mutation and transaction history.
//!
//! No HTTP and no storage engine here; the ledger is written against the
//! `wallet-core` store ports and receives its store at construction.

pub mod clock;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod policy;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::LedgerError;
pub use ledger::{Ledger, LedgerConfig, Reconciliation, ReplenishOutcome};
pub use locks::{AccountGuard, AccountLocks};
pub use policy::{LimitRejection, TierLimits};
