//! Ledger storage adapters.
//!
//! Both adapters implement the `wallet-core` store ports. The in-memory one
//! backs dev runs and tests; the Postgres one backs deployments.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
