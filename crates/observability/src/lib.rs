//! Process-wide tracing setup shared by the wallet binaries and tests.

/// Initialize JSON logging filtered by `RUST_LOG` (default `info`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init("info");
}

pub mod tracing;

pub use crate::tracing::{RequestId, request_span};
