//! Per-IP creation rate limiting.
//!
//! Wish creation is the only rate-limited operation: a single IP may create
//! at most `max_wishes_per_day` wishes per UTC day. State is a fixed daily
//! window per IP held in memory; a background task evicts stale windows.
//!
//! # Security Note
//!
//! X-Forwarded-For is NOT trusted by default, since clients can set it
//! freely. Enable `trust_forwarded_headers` only behind a proxy that
//! overwrites the header.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use time::{Date, OffsetDateTime};
use tokio::task::JoinHandle;
use wisp_core::config::RateLimitConfig;

/// Client IP resolved by the creation middleware, for handlers downstream.
#[derive(Clone, Debug)]
pub struct ClientIp(pub String);

/// One IP's creation count for a single UTC day.
#[derive(Clone, Copy, Debug)]
struct Window {
    day: Date,
    count: u32,
}

/// Rate limiter state shared across requests.
#[derive(Clone)]
pub struct RateLimitState {
    inner: Option<Arc<RateLimitInner>>,
}

/// Inner state that's only allocated when rate limiting is enabled.
struct RateLimitInner {
    windows: DashMap<String, Window>,
    max_per_day: u32,
    trust_forwarded: bool,
}

impl RateLimitState {
    /// Create a new rate limit state from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        if !config.enabled {
            return Self { inner: None };
        }
        Self {
            inner: Some(Arc::new(RateLimitInner {
                windows: DashMap::new(),
                max_per_day: config.max_wishes_per_day,
                trust_forwarded: config.trust_forwarded_headers,
            })),
        }
    }

    /// Whether the limiter is active at all.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Whether forwarded headers should be used for client IPs.
    pub fn trust_forwarded(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.trust_forwarded)
    }

    /// Check whether `ip` may create another wish today.
    pub fn check(&self, ip: &str, now: OffsetDateTime) -> Result<(), String> {
        let Some(inner) = &self.inner else {
            return Ok(());
        };
        let today = now.date();
        let count = inner
            .windows
            .get(ip)
            .filter(|window| window.day == today)
            .map(|window| window.count)
            .unwrap_or(0);
        if count >= inner.max_per_day {
            return Err(format!(
                "Rate limit exceeded. Maximum {} wishes per day per IP.",
                inner.max_per_day
            ));
        }
        Ok(())
    }

    /// Count one successful creation for `ip`.
    pub fn record(&self, ip: &str, now: OffsetDateTime) {
        let Some(inner) = &self.inner else {
            return;
        };
        let today = now.date();
        inner
            .windows
            .entry(ip.to_string())
            .and_modify(|window| {
                if window.day == today {
                    window.count += 1;
                } else {
                    *window = Window {
                        day: today,
                        count: 1,
                    };
                }
            })
            .or_insert(Window {
                day: today,
                count: 1,
            });
    }

    /// Drop windows from previous days. Returns the number evicted.
    pub fn evict_expired(&self, now: OffsetDateTime) -> usize {
        let Some(inner) = &self.inner else {
            return 0;
        };
        let today = now.date();
        let before = inner.windows.len();
        inner.windows.retain(|_, window| window.day == today);
        before - inner.windows.len()
    }
}

/// Resolve the client IP from connection info and, when trusted, headers.
pub fn client_ip(
    headers: &HeaderMap,
    connect_info: Option<SocketAddr>,
    trust_forwarded: bool,
) -> String {
    if trust_forwarded {
        if let Some(forwarded) = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
        {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }
    connect_info
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware guarding the wish-creation route.
///
/// Resolves the client IP once, stashes it as a [`ClientIp`] extension for
/// the handler, and enforces the daily quota. The window is only charged
/// when creation actually succeeds, so validation failures don't eat into
/// the day's quota.
pub async fn creation_rate_limit_middleware(
    State(state): State<RateLimitState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let connect_info = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ip = client_ip(req.headers(), connect_info, state.trust_forwarded());
    req.extensions_mut().insert(ClientIp(ip.clone()));

    if !state.is_enabled() {
        return next.run(req).await;
    }

    let now = OffsetDateTime::now_utc();
    if let Err(message) = state.check(&ip, now) {
        tracing::warn!(ip = %ip, "Creation rate limit exceeded");
        return crate::error::ApiError::RateLimited(message).into_response();
    }

    let response = next.run(req).await;
    if response.status() == StatusCode::CREATED {
        state.record(&ip, now);
    }
    response
}

/// Spawn a background task that periodically evicts expired windows.
pub fn spawn_cleanup_task(state: RateLimitState, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let evicted = state.evict_expired(OffsetDateTime::now_utc());
            if evicted > 0 {
                tracing::debug!(evicted = evicted, "Evicted expired rate limit windows");
            }
        }
    })
}
