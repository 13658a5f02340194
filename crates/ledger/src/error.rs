use thiserror::Error;

use wallet_core::{Money, StoreError};

use crate::policy::LimitRejection;

/// Everything a ledger operation can return besides success.
///
/// All variants except `Store` are expected business outcomes: nothing was
/// mutated and the caller picks the user-visible status.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Unknown account, or the handle's digest no longer matches it.
    #[error("account not found")]
    NotFound,

    /// Replenishments must be strictly positive.
    #[error("invalid amount {0}: replenishment must be positive")]
    InvalidAmount(Money),

    #[error("maximum balance for an unidentified account is {limit}")]
    UnidentifiedLimitExceeded { limit: Money },

    #[error("maximum balance for an identified account is {limit}")]
    IdentifiedLimitExceeded { limit: Money },

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => LedgerError::NotFound,
            other => LedgerError::Store(other),
        }
    }
}

impl From<LimitRejection> for LedgerError {
    fn from(value: LimitRejection) -> Self {
        match value {
            LimitRejection::UnidentifiedLimitExceeded { limit } => {
                LedgerError::UnidentifiedLimitExceeded { limit }
            }
            LimitRejection::IdentifiedLimitExceeded { limit } => {
                LedgerError::IdentifiedLimitExceeded { limit }
            }
        }
    }
}
