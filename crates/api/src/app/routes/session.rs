use std::sync::Arc;

use axum::{
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::app::dto::{LoginRequest, LoginResponse, StatusResponse};
use crate::app::routes::common::json_body;
use crate::app::{errors, services::AppServices};
use crate::context::AccountContext;

/// Exchange a login/password pair for the account id and digest used as
/// session headers.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let body = match json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.login(&body.login, &body.password).await {
        Ok(handle) => (
            StatusCode::OK,
            Json(LoginResponse {
                id: handle.account_id().get(),
                digest: handle.digest().as_str().to_string(),
            }),
        )
            .into_response(),
        Err(e) => errors::login_error_to_response(e),
    }
}

/// Reached only after the auth middleware accepted the headers.
pub async fn authentication(Extension(account): Extension<AccountContext>) -> Response {
    tracing::debug!(account_id = %account.account_id(), "session verified");
    (StatusCode::OK, Json(StatusResponse { status: "ok" })).into_response()
}
