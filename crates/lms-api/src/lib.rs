//! # lms-api: Axum API Service for the LMS
//!
//! REST backend for a school's learning management system. Deans, HODs,
//! course coordinators, teachers and students share one API; what each may
//! do is decided by role and by the department, course or section involved.
//!
//! ## API Surface
//!
//! | Prefix                                | Module                       |
//! |---------------------------------------|------------------------------|
//! | `/v1/departments`                     | [`routes::departments`]      |
//! | `/v1/users/*`                         | [`routes::users`]            |
//! | `/v1/courses/*`                       | [`routes::courses`]          |
//! | `/v1/courses/:id/arrangement/*`       | [`routes::arrangements`]     |
//! | `/v1/courses/:id/content`             | [`routes::arrangements`]     |
//! | `/v1/sections/*`                      | [`routes::sections`]         |
//! | `/v1/sections/:id/messages`           | [`routes::chat`]             |
//! | `/v1/notifications/*`                 | [`routes::notifications`]    |
//! | `/v1/analytics/*`                     | [`routes::analytics`]        |
//! | `/v1/export/*`                        | [`routes::export`]           |
//! | `/v1/security/attempts`               | [`routes::security`]         |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → Metrics → Auth → RateLimit → RecordDenials → Handler
//! ```
//!
//! Rate limiting is keyed by the authenticated caller, so it runs after auth.
//! Failed authentications share one bucket inside the auth middleware.
//!
//! ## OpenAPI
//!
//! Generated with utoipa and served at `/openapi.json`.

pub mod access;
pub mod auth;
pub mod bootstrap;
pub mod csv;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod notify;
pub mod openapi;
pub mod routes;
pub mod security;
pub mod state;

use axum::extract::State;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::{Extension, Json, Router};
use lms_core::Role;

use crate::auth::{require_role, AuthConfig, CallerIdentity};
use crate::error::AppError;
use crate::middleware::metrics::{ApiMetrics, MetricsSnapshot};
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware
/// so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(RateLimitConfig::per_minute(
        state.config.rate_limit_per_minute,
    ));
    let security_log = state.security_log.clone();

    let api = Router::new()
        .merge(routes::departments::router())
        .merge(routes::users::router())
        .merge(routes::courses::router())
        .merge(routes::arrangements::router())
        .merge(routes::sections::router())
        .merge(routes::chat::router())
        .merge(routes::notifications::router())
        .merge(routes::analytics::router())
        .merge(routes::export::router())
        .merge(routes::security::router())
        .merge(openapi::router())
        .route("/metrics", get(metrics_handler))
        .layer(from_fn(security::record_denials))
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(Extension(auth_config))
        .layer(Extension(metrics))
        .layer(Extension(limiter))
        .layer(Extension(security_log))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness probe: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 when the database (if configured) answers.
async fn readiness(State(state): State<AppState>) -> Result<&'static str, AppError> {
    if let Some(pool) = &state.db_pool {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map_err(|e| AppError::ServiceUnavailable(format!("database not reachable: {e}")))?;
    }
    Ok("ready")
}

/// Request and error counters (Dean).
async fn metrics_handler(
    caller: CallerIdentity,
    Extension(metrics): Extension<ApiMetrics>,
) -> Result<Json<MetricsSnapshot>, AppError> {
    require_role(&caller, Role::Dean)?;
    Ok(Json(metrics.snapshot()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{send, send_raw, token, Fixture};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn health_probes_skip_auth() {
        let fx = Fixture::new();
        let (status, body) = send_raw(&fx.app(), "GET", "/health/liveness", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
        let (status, body) = send_raw(&fx.app(), "GET", "/health/readiness", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ready");
    }

    #[tokio::test]
    async fn metrics_count_requests_for_deans() {
        let fx = Fixture::new();
        let app = fx.app();
        send(&app, "GET", "/v1/departments", Some(&token(Role::Teacher, fx.teacher)), None).await;
        send(&app, "GET", "/v1/courses", None, None).await;

        let (status, _) = send(
            &app,
            "GET",
            "/metrics",
            Some(&token(Role::Hod, fx.hod)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            "GET",
            "/metrics",
            Some(&token(Role::Dean, fx.dean)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requests"], 3);
        assert_eq!(body["client_errors"], 2);
        assert_eq!(body["server_errors"], 0);
    }

    fn limited_app(per_minute: u64) -> Router {
        let mut config = Fixture::new().state.config.clone();
        config.rate_limit_per_minute = per_minute;
        app(AppState::with_config(config, None))
    }

    #[tokio::test]
    async fn rate_limit_applies_per_caller() {
        let app = limited_app(2);
        for _ in 0..2 {
            let (status, _) = send(&app, "GET", "/v1/departments", Some("test-secret"), None).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, body) = send(&app, "GET", "/v1/departments", Some("test-secret"), None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "RATE_LIMITED");
    }

    #[tokio::test]
    async fn forged_identities_share_one_bucket() {
        let app = limited_app(2);
        let mut statuses = Vec::new();
        for _ in 0..20 {
            let forged = format!("hod:{}:wrong", uuid::Uuid::new_v4());
            let (status, _) = send(&app, "GET", "/v1/departments", Some(&forged), None).await;
            statuses.push(status);
        }
        assert_eq!(statuses[..2], [StatusCode::UNAUTHORIZED; 2]);
        assert!(statuses[2..].iter().all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
    }

    #[tokio::test]
    async fn bad_guesses_do_not_lock_out_the_service_token() {
        let app = limited_app(2);
        for guess in 0..5 {
            let guess = format!("guess-{guess}");
            let (status, _) = send(&app, "GET", "/v1/departments", Some(&guess), None).await;
            assert_ne!(status, StatusCode::OK);
        }
        let (status, _) = send(&app, "GET", "/v1/departments", Some("test-secret"), None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
