use std::sync::Arc;

use axum::{
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::app::dto::{ActivityResponse, BalanceResponse, ReplenishRequest};
use crate::app::routes::common::json_body;
use crate::app::{errors, services::AppServices};
use crate::context::AccountContext;

pub async fn balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
) -> Response {
    match services.ledger().balance(account.handle()).await {
        Ok(balance) => (StatusCode::OK, Json(BalanceResponse { balance })).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn replenishment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    body: Result<Json<ReplenishRequest>, JsonRejection>,
) -> Response {
    let body = match json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.ledger().replenish(account.handle(), body.amount).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(BalanceResponse {
                balance: outcome.new_balance,
            }),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Count and total of this calendar month's replenishments.
pub async fn transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
) -> Response {
    match services.ledger().activity_summary(account.handle()).await {
        Ok(summary) => (StatusCode::OK, Json(ActivityResponse::from(summary))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
