//! Storage error model shared by every store port.

use thiserror::Error;

/// Result type used across the store ports.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-level error.
///
/// Business rejections (tier limits, bad amounts) never show up here; this is
/// strictly about persistence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No row matched the lookup (unknown id, digest, or id+digest pair).
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint rejected the write (e.g. duplicate credential digest).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// A conditional write lost a race (the stored balance moved underneath it).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The call did not complete within the caller-supplied deadline.
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    /// Anything else the backend reported (connection loss, decode failure, ...).
    #[error("backend error in {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
