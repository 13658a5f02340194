use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::response::Response;

use crate::app::errors;

/// Unwrap a JSON body, turning any extraction failure into a 400.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(errors::bad_request_body(rejection.body_text())),
    }
}
