use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use wallet_auth::AuthError;
use wallet_ledger::LedgerError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn bad_request_header(message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, "bad_request_header", message)
}

pub fn bad_request_body(message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, "bad_request_body", message)
}

/// Store internals are logged where they happen; clients get a generic 500.
fn server_error() -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "server_error", "internal server error")
}

pub fn ledger_error_to_response(err: LedgerError) -> Response {
    match err {
        LedgerError::NotFound => json_error(StatusCode::UNAUTHORIZED, "unauthorized", "account not found"),
        LedgerError::InvalidAmount(_) => json_error(StatusCode::BAD_REQUEST, "invalid_amount", err.to_string()),
        LedgerError::UnidentifiedLimitExceeded { .. } => {
            json_error(StatusCode::CONFLICT, "unidentified_limit_exceeded", err.to_string())
        }
        LedgerError::IdentifiedLimitExceeded { .. } => {
            json_error(StatusCode::CONFLICT, "identified_limit_exceeded", err.to_string())
        }
        LedgerError::Store(_) => server_error(),
    }
}

/// Map a failed session check (headers present but not a real account).
pub fn auth_error_to_response(err: AuthError) -> Response {
    match err {
        AuthError::NotFound => json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unknown account or digest"),
        AuthError::Store(e) => {
            tracing::error!(error = %e, "authentication store failure");
            server_error()
        }
    }
}

/// Map a failed login (login/password pair).
pub fn login_error_to_response(err: AuthError) -> Response {
    match err {
        AuthError::NotFound => json_error(StatusCode::NOT_FOUND, "user_not_found", "user not found"),
        other => auth_error_to_response(other),
    }
}
