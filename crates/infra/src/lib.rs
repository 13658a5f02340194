//! Infrastructure layer: storage adapters and account provisioning.

pub mod seed;
pub mod store;

pub use seed::{DEFAULT_SEED, SeedAccount, seed_accounts, seed_default_accounts};
pub use store::{InMemoryLedgerStore, PostgresLedgerStore};
