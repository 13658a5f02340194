//! Fixed account provisioning for fresh deployments and dev runs.

use wallet_core::{Account, AccountStore, Money, StoreError, StoreResult};

/// Login/password pair to provision, with its starting tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedAccount {
    pub login: &'static str,
    pub password: &'static str,
    pub identified: bool,
}

pub const DEFAULT_SEED: [SeedAccount; 2] = [
    SeedAccount {
        login: "test",
        password: "123",
        identified: true,
    },
    SeedAccount {
        login: "login",
        password: "qwerty",
        identified: false,
    },
];

/// Provision `seeds` with a zero balance. Accounts whose digest already exists
/// are returned as stored, untouched.
pub async fn seed_accounts<S>(store: &S, seeds: &[SeedAccount]) -> StoreResult<Vec<Account>>
where
    S: AccountStore + ?Sized,
{
    let mut accounts = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let digest = wallet_auth::sign(seed.login, seed.password);
        let account = match store
            .create_account(digest.clone(), Money::ZERO, seed.identified)
            .await
        {
            Ok(created) => {
                tracing::info!(account_id = %created.id, login = seed.login, "seeded account");
                created
            }
            Err(StoreError::Duplicate(_)) => store.find_by_credential(&digest).await?,
            Err(e) => return Err(e),
        };
        accounts.push(account);
    }
    Ok(accounts)
}

pub async fn seed_default_accounts<S>(store: &S) -> StoreResult<Vec<Account>>
where
    S: AccountStore + ?Sized,
{
    seed_accounts(store, &DEFAULT_SEED).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryLedgerStore;

    #[tokio::test]
    async fn seeding_twice_is_a_no_op() {
        let store = InMemoryLedgerStore::new();

        let first = seed_default_accounts(&store).await.unwrap();
        let second = seed_default_accounts(&store).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[tokio::test]
    async fn seeds_match_known_digests_and_tiers() {
        let store = InMemoryLedgerStore::new();
        seed_default_accounts(&store).await.unwrap();

        let test = store
            .find_by_credential(&wallet_auth::sign("test", "123"))
            .await
            .unwrap();
        assert!(test.identified);
        assert_eq!(test.balance, Money::ZERO);
        assert_eq!(test.credential_digest.as_str(), "E05gezGtBApuw+9lqIqXkZ5lsUo=");

        let login = store
            .find_by_credential(&wallet_auth::sign("login", "qwerty"))
            .await
            .unwrap();
        assert!(!login.identified);
    }
}
