//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with role-based access control.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{user_id}:{secret}   user token
//! Bearer {secret}                    service token (treated as Dean)
//! ```
//!
//! `role` is one of `student`, `teacher`, `course_coordinator` (or `cc`),
//! `hod`, `dean`. `user_id` is a UUID and may be empty only for `dean`.
//! When no `AUTH_TOKEN` is configured, authentication is disabled and every
//! request runs as Dean.
//!
//! Every rejected attempt is written to the [`SecurityLog`] and counted
//! against the shared unauthenticated rate-limit bucket; once that bucket is
//! exhausted failures get 429 instead of 401.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lms_core::{Role, UserId};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::middleware::rate_limit::{too_many_requests, RateLimiter, UNAUTHENTICATED_KEY};
use crate::security::{AttemptKind, SecurityLog};

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller, injected by [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    /// `None` for service tokens and when auth is disabled.
    pub user_id: Option<UserId>,
}

impl CallerIdentity {
    /// Service identity used for bare-secret tokens and disabled auth.
    pub fn service() -> Self {
        Self {
            role: Role::Dean,
            user_id: None,
        }
    }

    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// Whether the caller is the given user.
    pub fn is_user(&self, user: UserId) -> bool {
        self.user_id == Some(user)
    }
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller has at least the required role (403 otherwise).
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

/// The caller's user id, or 403 for service identities.
pub fn require_user(caller: &CallerIdentity) -> Result<UserId, AppError> {
    caller
        .user_id
        .ok_or_else(|| AppError::Forbidden("this action requires a user token".into()))
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token in `{role}:{user_id}:{secret}` or `{secret}` form.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.as_slice() {
        [secret] => {
            if constant_time_token_eq(secret, expected_secret) {
                Ok(CallerIdentity::service())
            } else {
                Err("invalid bearer token".into())
            }
        }
        [role_str, user_str, secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }

            let role = Role::parse(role_str).map_err(|e| e.to_string())?;

            let user_id = if user_str.is_empty() {
                if role != Role::Dean {
                    return Err(format!("user_id is required for role '{role}'"));
                }
                None
            } else {
                let uuid = user_str
                    .parse::<Uuid>()
                    .map_err(|e| format!("invalid user_id: {e}"))?;
                Some(UserId::from_uuid(uuid))
            };

            Ok(CallerIdentity { role, user_id })
        }
        _ => Err("invalid token format, expected {role}:{user_id}:{secret} or {secret}".into()),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the Bearer token and inject [`CallerIdentity`] into extensions.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    let expected = match expected_token {
        Some(AuthConfig {
            token: Some(expected),
        }) => expected,
        _ => {
            request.extensions_mut().insert(CallerIdentity::service());
            return next.run(request).await;
        }
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let outcome = match auth_header {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(provided) => parse_bearer_token(provided.trim(), &expected)
                .map_err(|msg| (AttemptKind::InvalidToken, msg)),
            None => Err((
                AttemptKind::InvalidScheme,
                "authorization header must use Bearer scheme".to_string(),
            )),
        },
        None => Err((
            AttemptKind::MissingCredentials,
            "missing authorization header".to_string(),
        )),
    };

    match outcome {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err((kind, msg)) => {
            if let Some(log) = request.extensions().get::<SecurityLog>() {
                log.record(
                    kind,
                    request.method().as_str(),
                    request.uri().path(),
                    None,
                    &msg,
                );
            } else {
                tracing::warn!(reason = %msg, "authentication failed");
            }
            if let Some(limiter) = request.extensions().get::<RateLimiter>() {
                if !limiter.check(UNAUTHENTICATED_KEY) {
                    tracing::warn!("failed authentications rate limited");
                    return too_many_requests();
                }
            }
            unauthorized_response(&msg)
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
