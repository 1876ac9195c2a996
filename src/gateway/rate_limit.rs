//! Login attempt limiting, keyed by client IP address.
//!
//! The client is the TCP peer (`ConnectInfo<SocketAddr>`). Forwarded headers
//! are only consulted when `gateway.trust_forwarded_headers` says a reverse
//! proxy sits in front; otherwise any caller could pick its own bucket.

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use parking_lot::Mutex;

use super::{pages, AppState};

/// Window the per-minute limit is measured over.
pub const LOGIN_WINDOW_SECS: u64 = 60;

/// Clients idle for this long are dropped from the table.
const IDLE_SWEEP_SECS: u64 = 300;

/// Outcome of recording one login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug)]
struct AttemptLog {
    by_client: HashMap<IpAddr, VecDeque<Instant>>,
    last_sweep: Instant,
}

/// Sliding-log limiter: each client keeps the instants of its attempts within the window.
#[derive(Debug)]
pub struct LoginRateLimiter {
    limit: u32,
    window: Duration,
    log: Mutex<AttemptLog>,
}

impl LoginRateLimiter {
    /// `limit_per_minute == 0` disables limiting.
    pub fn per_minute(limit_per_minute: u32) -> Self {
        Self::new(limit_per_minute, Duration::from_secs(LOGIN_WINDOW_SECS))
    }

    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            log: Mutex::new(AttemptLog {
                by_client: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Record an attempt from `client` unless its window is already full.
    pub fn check(&self, client: IpAddr) -> Admission {
        if self.limit == 0 {
            return Admission::Allowed {
                remaining: u32::MAX,
            };
        }
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> Admission {
        let mut log = self.log.lock();

        if now.saturating_duration_since(log.last_sweep) >= Duration::from_secs(IDLE_SWEEP_SECS) {
            let window = self.window;
            log.by_client.retain(|_, attempts| {
                attempts
                    .back()
                    .is_some_and(|last| now.saturating_duration_since(*last) < window)
            });
            log.last_sweep = now;
        }

        let attempts = log.by_client.entry(client).or_default();
        while attempts
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) >= self.window)
        {
            attempts.pop_front();
        }

        if attempts.len() >= self.limit as usize {
            // Oldest attempt leaving the window frees the next slot.
            let retry_after = attempts.front().map_or(self.window, |first| {
                self.window.saturating_sub(now.saturating_duration_since(*first))
            });
            return Admission::Limited { retry_after };
        }

        attempts.push_back(now);
        Admission::Allowed {
            remaining: self.limit - attempts.len() as u32,
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.log.lock().by_client.len()
    }
}

/// Resolve the client address a login attempt is charged to.
///
/// With `trust_forwarded` the rightmost `X-Forwarded-For` entry is used (the
/// one appended by the proxy itself; entries to its left are caller-supplied),
/// then `X-Real-IP`. Unparsable header values fall through to the peer address.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded: bool,
) -> Option<IpAddr> {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|list| list.rsplit(',').next())
            .and_then(|last| last.trim().parse::<IpAddr>().ok())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
            })
    };

    trust_forwarded
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip()))
}

fn header_value(value: impl std::fmt::Display) -> HeaderValue {
    HeaderValue::try_from(value.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

/// Route layer for `POST /login`.
pub async fn login_rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let Some(client) = client_ip(req.headers(), peer, state.trust_forwarded_headers) else {
        tracing::error!("Login rejected: client address unavailable");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(pages::LOGIN_FAILED_FRAGMENT),
        )
            .into_response();
    };

    match state.login_limiter.check(client) {
        Admission::Allowed { remaining } => {
            let mut response = next.run(req).await;
            if state.login_limiter.limit() > 0 {
                let headers = response.headers_mut();
                let limit = state.login_limiter.limit();
                headers.insert("x-ratelimit-limit", header_value(limit));
                headers.insert("x-ratelimit-remaining", header_value(remaining));
            }
            response
        }
        Admission::Limited { retry_after } => {
            tracing::warn!(client = %client, "Login rate limit exceeded");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Html(pages::RATE_LIMITED_FRAGMENT),
            )
                .into_response();
            let headers = response.headers_mut();
            let limit = state.login_limiter.limit();
            headers.insert(header::RETRY_AFTER, header_value(retry_after.as_secs().max(1)));
            headers.insert("x-ratelimit-limit", header_value(limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
            response
        }
    }
}
