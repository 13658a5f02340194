use axum::{Router, routing::post};

pub mod common;
pub mod session;
pub mod system;
pub mod wallet;

/// Router for endpoints that need an authenticated account.
pub fn router() -> Router {
    Router::new()
        .route("/authentication", post(session::authentication))
        .route("/balance", post(wallet::balance))
        .route("/replenishment", post(wallet::replenishment))
        .route("/transactions", post(wallet::transactions))
}
