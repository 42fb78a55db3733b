//! Per-client rate limiting for the credential endpoints.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock as _, DefaultClock},
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use tracing::warn;

use crate::config::{RateLimit, RateLimitConfig};
use crate::error::ApiError;
use crate::state::AppState;

pub type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

#[derive(Clone)]
pub struct RateLimiters {
    /// Registration and login draw from the same bucket.
    auth: Arc<KeyedLimiter>,
    refresh: Arc<KeyedLimiter>,
}

impl RateLimiters {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            auth: Arc::new(RateLimiter::keyed(quota(config.auth))),
            refresh: Arc::new(RateLimiter::keyed(quota(config.refresh))),
        }
    }
}

/// A full bucket of `max`, refilled one cell every `window / max`.
fn quota(limit: RateLimit) -> Quota {
    Quota::with_period(limit.window / limit.max.get())
        .unwrap_or_else(|| Quota::per_second(limit.max))
        .allow_burst(limit.max)
}

/// Clients are keyed by peer address; without one they share a bucket.
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        .unwrap_or_else(|| "ip:unknown".to_string())
}

fn check(limiter: &KeyedLimiter, request: &Request) -> Result<(), ApiError> {
    let key = client_key(request);
    limiter.check_key(&key).map_err(|not_until| {
        let wait = not_until.wait_time_from(DefaultClock::default().now());
        warn!(
            key = %key,
            method = %request.method(),
            path = %request.uri().path(),
            "rate limit exceeded"
        );
        ApiError::RateLimited {
            retry_after_secs: wait.as_secs().max(1),
        }
    })
}

pub async fn limit_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    check(&state.rate_limiters.auth, &request)?;
    Ok(next.run(request).await)
}

pub async fn limit_refresh(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    check(&state.rate_limiters.refresh, &request)?;
    Ok(next.run(request).await)
}
