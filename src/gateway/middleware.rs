//! Session gate and request logging layers.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::AppState;

/// Header carrying the per-request correlation id.
pub static REQUEST_ID: HeaderName = HeaderName::from_static("request-id");

/// Where unauthenticated browsers are sent.
pub const LOGIN_PATH: &str = "/login";

/// `303 See Other` to the login page, with no hint about why.
pub fn redirect_to_login() -> Response {
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, HeaderValue::from_static(LOGIN_PATH))],
    )
        .into_response()
}

/// Gate for protected routes.
///
/// A valid session cookie puts the caller's [`Identity`](crate::auth::Identity)
/// into request extensions, resolved through the identity source so handlers
/// see the display name. Anything else redirects to [`LOGIN_PATH`] without
/// running the handler.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let verified = match state.cookies.read_session_cookie(req.headers()) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(reason = e.kind(), path = %req.uri().path(), "Session rejected");
            return redirect_to_login();
        }
    };

    // A sealed id that no longer maps to an account is treated like a bad token.
    let Some(identity) = state.validator.resolve(&verified.id) else {
        tracing::debug!(reason = "unknown_identity", path = %req.uri().path(), "Session rejected");
        return redirect_to_login();
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// Tag every response with a `Request-Id` and emit one access log line.
pub async fn log_requests(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let header_value =
        HeaderValue::from_str(&request_id).unwrap_or_else(|_| HeaderValue::from_static("invalid"));
    req.headers_mut().insert(REQUEST_ID.clone(), header_value.clone());

    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let mut response = next.run(req).await;
    response.headers_mut().insert(REQUEST_ID.clone(), header_value);

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        tracing::warn!(
            %method,
            path = %path,
            status,
            latency_ms,
            request_id = %request_id,
            "Request handled"
        );
    } else {
        tracing::info!(
            %method,
            path = %path,
            status,
            latency_ms,
            request_id = %request_id,
            "Request handled"
        );
    }
    response
}
