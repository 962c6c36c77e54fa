//! # Per-Caller Rate Limiting
//!
//! Fixed-window limiter keyed by the authenticated [`CallerIdentity`]
//! (`role:user_id`, or `service`). It runs inside the auth middleware, so the
//! key can only come from a token whose secret checked out. Failed
//! authentications never reach it; [`crate::auth::auth_middleware`] counts
//! them against the single [`UNAUTHENTICATED_KEY`] bucket instead.
//!
//! Expired windows are swept at most once per window length, so the map only
//! holds callers seen during the current window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;

use crate::auth::CallerIdentity;
use crate::error::{ErrorBody, ErrorDetail};

/// Bucket shared by every request that failed authentication.
pub const UNAUTHENTICATED_KEY: &str = "unauthenticated";

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn per_minute(max_requests: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_minute(1000)
    }
}

#[derive(Debug, Clone)]
struct Window {
    count: u64,
    started: Instant,
}

#[derive(Debug)]
struct Windows {
    by_key: HashMap<String, Window>,
    last_sweep: Instant,
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<Mutex<Windows>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(Windows {
                by_key: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    /// Count a request for `key`; `false` once the window is exhausted.
    pub fn check(&self, key: &str) -> bool {
        let mut windows = self.windows.lock();
        let now = Instant::now();
        let length = self.config.window;

        if now.duration_since(windows.last_sweep) >= length {
            windows
                .by_key
                .retain(|_, w| now.duration_since(w.started) < length);
            windows.last_sweep = now;
        }

        let window = windows.by_key.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(window.started) >= length {
            window.count = 0;
            window.started = now;
        }

        if window.count >= self.config.max_requests {
            false
        } else {
            window.count += 1;
            true
        }
    }

    /// Number of callers with a live or not yet swept window.
    pub fn tracked_callers(&self) -> usize {
        self.windows.lock().by_key.len()
    }
}

/// Rate-limit key for an authenticated caller.
pub fn caller_key(caller: &CallerIdentity) -> String {
    match caller.user_id {
        Some(user) => format!("{}:{}", caller.role.as_str(), user.as_uuid()),
        None => "service".to_string(),
    }
}

/// 429 with the standard error body.
pub fn too_many_requests() -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "RATE_LIMITED".to_string(),
            message: "rate limit exceeded".to_string(),
            details: None,
        },
    };
    (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
}

/// Middleware that enforces per-caller rate limits. Must run after auth.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<RateLimiter>().cloned();
    let caller = request.extensions().get::<CallerIdentity>().cloned();

    if let (Some(limiter), Some(caller)) = (limiter, caller) {
        let key = caller_key(&caller);
        if !limiter.check(&key) {
            tracing::warn!(key = %key, "rate limit exceeded");
            return too_many_requests();
        }
    }

    next.run(request).await
}
