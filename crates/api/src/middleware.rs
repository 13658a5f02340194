use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use wallet_core::{AccountId, CredentialDigest};
use wallet_observability::{RequestId, request_span};

use crate::app::{errors, services::AppServices};
use crate::context::AccountContext;

pub const USER_ID_HEADER: &str = "x-userid";
pub const DIGEST_HEADER: &str = "x-digest";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Resolve `X-UserID` + `X-Digest` into an [`AccountContext`].
///
/// Missing or malformed headers are a 400; a well-formed pair that names no
/// account is a 401.
pub async fn auth_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Response {
    let (id, digest) = match extract_claim(req.headers()) {
        Ok(claim) => claim,
        Err(reason) => return errors::bad_request_header(reason),
    };

    let handle = match services.authenticate(id, &digest).await {
        Ok(handle) => handle,
        Err(e) => return errors::auth_error_to_response(e),
    };

    req.extensions_mut().insert(AccountContext::new(handle));
    next.run(req).await
}

fn extract_claim(headers: &HeaderMap) -> Result<(AccountId, CredentialDigest), &'static str> {
    let id = headers
        .get(USER_ID_HEADER)
        .ok_or("missing X-UserID header")?
        .to_str()
        .map_err(|_| "X-UserID is not valid text")?;
    let id = AccountId::from_str(id).map_err(|_| "X-UserID must be an integer")?;

    let digest = headers
        .get(DIGEST_HEADER)
        .ok_or("missing X-Digest header")?
        .to_str()
        .map_err(|_| "X-Digest is not valid text")?
        .trim();
    if digest.is_empty() {
        return Err("X-Digest must not be empty");
    }

    Ok((id, CredentialDigest::new(digest)))
}

/// Per-request span with a fresh request id, plus one completion log line
/// carrying status and elapsed time.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let request_id = RequestId::new();
    let span = request_span(request_id, req.method().as_str(), req.uri().path());
    let started = Instant::now();

    let mut response = next.run(req).instrument(span.clone()).await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
    span.in_scope(|| {
        tracing::info!(status = response.status().as_u16(), elapsed_ms, "request handled");
    });

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
