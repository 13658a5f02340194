//! Process configuration.
//!
//! Resolution order: built-in defaults, then the JSON file named by
//! `WALLET_CONFIG` (if any), then individual environment overrides.
//! A missing or unreadable file keeps the defaults; a bad env value is fatal.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use wallet_ledger::{LedgerConfig, TierLimits};

pub const CONFIG_FILE_VAR: &str = "WALLET_CONFIG";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Postgres URL; `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub store_timeout_ms: u64,
    pub max_commit_attempts: u32,
    /// Provision the fixed demo accounts at startup.
    pub seed_accounts: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: None,
            store_timeout_ms: 5_000,
            max_commit_attempts: 3,
            seed_accounts: true,
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var(CONFIG_FILE_VAR).ok();
        Self::load_with(file.as_deref().map(Path::new), |var| std::env::var(var).ok())
    }

    /// Load from an optional file and an arbitrary env lookup.
    pub fn load_with<F>(file: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match file {
            Some(path) => Self::from_file(path),
            None => Self::default(),
        };
        config.apply_env(env)?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "config file unreadable; using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "config file malformed; using defaults");
                Self::default()
            }
        }
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = env("WALLET_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(url) = env("DATABASE_URL") {
            self.database_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(raw) = env("WALLET_STORE_TIMEOUT_MS") {
            self.store_timeout_ms = parse_env("WALLET_STORE_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = env("WALLET_MAX_COMMIT_ATTEMPTS") {
            self.max_commit_attempts = parse_env("WALLET_MAX_COMMIT_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = env("WALLET_SEED_ACCOUNTS") {
            self.seed_accounts = parse_env("WALLET_SEED_ACCOUNTS", &raw)?;
        }

        if self.store_timeout_ms == 0 {
            return Err(ConfigError::InvalidEnv {
                var: "WALLET_STORE_TIMEOUT_MS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.max_commit_attempts == 0 {
            return Err(ConfigError::InvalidEnv {
                var: "WALLET_MAX_COMMIT_ATTEMPTS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            store_timeout: self.store_timeout(),
            lock_timeout: self.store_timeout() * 2,
            max_commit_attempts: self.max_commit_attempts,
            limits: TierLimits::default(),
        }
    }
}

fn parse_env<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
