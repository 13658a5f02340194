use serde::{Deserialize, Serialize};

use wallet_core::{ActivitySummary, Money};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplenishRequest {
    pub amount: Money,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: i64,
    pub digest: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: Money,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub count: u64,
    pub amount: Money,
}

impl From<ActivitySummary> for ActivityResponse {
    fn from(summary: ActivitySummary) -> Self {
        Self {
            count: summary.count,
            amount: summary.total,
        }
    }
}
