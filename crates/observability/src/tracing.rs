//! Subscriber initialization and request correlation.

use std::fmt;

use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Install the JSON subscriber. `default_filter` applies when `RUST_LOG` is
/// unset or unparsable.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Per-request correlation id (UUIDv7, so ids sort by arrival).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Span wrapping one HTTP request; handlers' events inherit its fields.
pub fn request_span(request_id: RequestId, method: &str, path: &str) -> tracing::Span {
    tracing::info_span!("request", request_id = %request_id, method, path)
}
