//! Axum HTTP gateway: login, logout, health and the session-protected routes.
//!
//! Router-wide layers:
//! - `Request-Id` header and one access log line per request
//! - CORS
//! - Request body size limit (64KB max)
//! - Request timeout (30s) to prevent slow-loris attacks
//!
//! Protected routes live on one sub-router carrying [`middleware::require_session`].

pub mod middleware;
pub mod pages;
pub mod rate_limit;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Extension, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::auth::{CredentialValidator, Identity};
use crate::config::{GatewayConfig, RuntimeAuth};
use crate::session::{SessionCookies, SessionTokens};

use self::rate_limit::LoginRateLimiter;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTMX client-side redirect header.
pub static HX_REDIRECT: HeaderName = HeaderName::from_static("hx-redirect");

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub cookies: SessionCookies,
    pub validator: Arc<CredentialValidator>,
    pub login_limiter: Arc<LoginRateLimiter>,
    /// Charge login attempts to proxy-supplied client addresses.
    pub trust_forwarded_headers: bool,
}

impl AppState {
    pub fn new(
        cookies: SessionCookies,
        validator: Arc<CredentialValidator>,
        login_limiter: Arc<LoginRateLimiter>,
    ) -> Self {
        Self {
            cookies,
            validator,
            login_limiter,
            trust_forwarded_headers: false,
        }
    }

    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    #[must_use]
    pub fn with_trusted_proxy(mut self, trust: bool) -> Self {
        self.trust_forwarded_headers = trust;
        self
    }

    /// Wire the session layer from validated settings. Consumes the key.
    pub fn from_runtime(auth: RuntimeAuth, gateway: &GatewayConfig) -> Result<Self> {
        let tokens = SessionTokens::shared(&auth.secret_key, auth.session_max_age_secs)
            .context("failed to initialise session cipher")?;
        let validator = CredentialValidator::new(Arc::new(auth.account))
            .map_err(|e| anyhow::anyhow!("failed to prepare credential validator: {e}"))?;
        Ok(Self::new(
            SessionCookies::new(tokens),
            Arc::new(validator),
            Arc::new(LoginRateLimiter::per_minute(
                gateway.login_attempts_per_minute,
            )),
        )
        .with_trusted_proxy(gateway.trust_forwarded_headers))
    }
}

/// Build the full router with all layers applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("hx-request"),
            HeaderName::from_static("hx-current-url"),
            HeaderName::from_static("hx-target"),
        ])
        .expose_headers([middleware::REQUEST_ID.clone(), HX_REDIRECT.clone()])
        .max_age(Duration::from_secs(3600));

    let protected = Router::new()
        .route("/", get(handle_home))
        .route("/api/me", get(handle_me))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/login",
            get(handle_login_page).merge(post(handle_login).route_layer(
                axum::middleware::from_fn_with_state(state.clone(), rate_limit::login_rate_limit),
            )),
        )
        .route("/logout", get(handle_logout))
        .merge(protected)
        .with_state(state)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
        .layer(axum::middleware::from_fn(middleware::log_requests))
}

/// Run the HTTP gateway until Ctrl-C.
pub async fn run_gateway(host: &str, port: u16, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local = listener.local_addr()?;

    tracing::info!(
        address = %local,
        trust_forwarded_headers = state.trust_forwarded_headers,
        "Gateway listening"
    );

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// ══════════════════════════════════════════════════════════════════════════════
// AXUM HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// GET /health: always public
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "serving",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /login
async fn handle_login_page() -> Html<String> {
    Html(pages::render_login_page())
}

/// Login form body. Missing fields count as empty so they fail like any bad login.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn fragment(status: StatusCode, body: &'static str) -> Response {
    (status, Html(body)).into_response()
}

/// POST /login: HTMX form submission, behind [`rate_limit::login_rate_limit`]
async fn handle_login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let LoginForm { username, password } = form;
    tracing::debug!(username = %username, "Login attempt");

    // Argon2 is deliberately slow; keep it off the async workers.
    let validator = Arc::clone(&state.validator);
    let checked_username = username.clone();
    let outcome =
        tokio::task::spawn_blocking(move || validator.validate(&checked_username, &password)).await;

    let identity = match outcome {
        Ok(Ok(identity)) => identity,
        Ok(Err(e)) => {
            tracing::warn!(username = %username, "Login failed: {e}");
            return fragment(StatusCode::UNAUTHORIZED, pages::INVALID_CREDENTIALS_FRAGMENT);
        }
        Err(e) => {
            tracing::error!(username = %username, "Login failed: credential check aborted: {e}");
            return fragment(StatusCode::INTERNAL_SERVER_ERROR, pages::LOGIN_FAILED_FRAGMENT);
        }
    };

    let set_cookie = match state
        .cookies
        .set_session_cookie(&identity)
        .map_err(|e| e.to_string())
        .and_then(|value| HeaderValue::from_str(&value).map_err(|e| e.to_string()))
    {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(username = %username, "Login failed: could not set cookie: {e}");
            return fragment(StatusCode::INTERNAL_SERVER_ERROR, pages::LOGIN_FAILED_FRAGMENT);
        }
    };

    tracing::info!(username = %username, user_id = %identity.id, "Login successful");
    (
        StatusCode::OK,
        [
            (header::SET_COOKIE, set_cookie),
            (HX_REDIRECT.clone(), HeaderValue::from_static("/")),
        ],
    )
        .into_response()
}

/// GET /logout: clears the cookie whether or not a session existed
async fn handle_logout() -> Response {
    let mut response = middleware::redirect_to_login();
    if let Ok(clear) = HeaderValue::from_str(&SessionCookies::clear_session_cookie()) {
        response.headers_mut().insert(header::SET_COOKIE, clear);
    }
    tracing::debug!("Session cookie cleared");
    response
}

fn display_name(identity: &Identity) -> String {
    identity
        .display_name
        .clone()
        .unwrap_or_else(|| identity.id.to_string())
}

/// GET /: protected
async fn handle_home(Extension(identity): Extension<Identity>) -> Html<String> {
    Html(pages::render_home_page(&display_name(&identity)))
}

/// GET /api/me: protected
async fn handle_me(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": identity.id.to_string(),
        "username": display_name(&identity),
    }))
}
