//! Store selection and the services shared by every handler.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use wallet_auth::{AuthError, Authenticator};
use wallet_core::{AccountHandle, AccountId, CredentialDigest, LedgerStore, StoreError};
use wallet_infra::{InMemoryLedgerStore, PostgresLedgerStore, seed_default_accounts};
use wallet_ledger::{Ledger, LedgerConfig};

use crate::config::AppConfig;

/// Type-erased store so the in-memory and Postgres wiring share one router.
pub type SharedStore = Arc<dyn LedgerStore>;

pub struct AppServices {
    authenticator: Authenticator<SharedStore>,
    ledger: Ledger<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore, ledger_config: LedgerConfig) -> Self {
        Self {
            authenticator: Authenticator::new(store.clone()),
            ledger: Ledger::new(store, ledger_config),
        }
    }

    pub fn ledger(&self) -> &Ledger<SharedStore> {
        &self.ledger
    }

    pub async fn login(&self, login: &str, password: &str) -> Result<AccountHandle, AuthError> {
        self.bounded("login", self.authenticator.login(login, password))
            .await
    }

    pub async fn authenticate(
        &self,
        id: AccountId,
        digest: &CredentialDigest,
    ) -> Result<AccountHandle, AuthError> {
        self.bounded("authenticate", self.authenticator.authenticate(id, digest))
            .await
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, AuthError>>,
    ) -> Result<T, AuthError> {
        tokio::time::timeout(self.store_timeout(), fut)
            .await
            .map_err(|_| AuthError::Store(StoreError::Timeout { operation }))?
    }

    fn store_timeout(&self) -> Duration {
        self.ledger.config().store_timeout
    }
}

/// In-memory services with the default seed accounts (dev/tests).
pub async fn in_memory_services(ledger_config: LedgerConfig) -> anyhow::Result<AppServices> {
    let store: SharedStore = Arc::new(InMemoryLedgerStore::new());
    seed_default_accounts(&*store)
        .await
        .context("seeding in-memory accounts")?;
    Ok(AppServices::new(store, ledger_config))
}

/// Pick and prepare the store named by `config`.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: SharedStore = match config.database_url.as_deref() {
        Some(url) => {
            let pg = PostgresLedgerStore::connect(url, config.store_timeout())
                .await
                .context("connecting to postgres")?;
            pg.provision_schema()
                .await
                .context("provisioning database schema")?;
            tracing::info!("using postgres ledger store");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory ledger store");
            Arc::new(InMemoryLedgerStore::new())
        }
    };

    if config.seed_accounts {
        let seeded = seed_default_accounts(&*store)
            .await
            .context("seeding default accounts")?;
        tracing::info!(accounts = seeded.len(), "seed accounts ready");
    }

    Ok(AppServices::new(store, config.ledger_config()))
}
