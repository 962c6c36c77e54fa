//! # Security Attempts & Audit Log
//!
//! - `GET /v1/security/attempts?limit=`: recent rejected requests, newest first (Dean)
//! - `GET /v1/security/audit/events?resource_type=&resource_id=`: one resource's trail (Dean)
//! - `GET /v1/security/audit/verify?limit=`: hash-chain check (Dean)
//!
//! The audit endpoints need a database and answer 503 without one.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use lms_core::Role;
use serde::Deserialize;
use sqlx::PgPool;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity};
use crate::db::audit::{self, AuditEventRow, ChainIntegrityResult};
use crate::error::AppError;
use crate::extractors::extract_query;
use crate::security::SecurityAttempt;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;
const DEFAULT_VERIFY_LIMIT: i64 = 10_000;
const MAX_VERIFY_LIMIT: i64 = 1_000_000;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AttemptsQuery {
    /// Default 100, at most 1000.
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditEventsQuery {
    /// `course`, `arrangement`, `section`, ...
    pub resource_type: String,
    pub resource_id: Uuid,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct VerifyQuery {
    /// Events to check from the start of the chain. Default 10000.
    pub limit: Option<i64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/security/attempts", get(list_attempts))
        .route("/v1/security/audit/events", get(audit_events))
        .route("/v1/security/audit/verify", get(verify_audit_chain))
}

fn audit_pool(state: &AppState) -> Result<&PgPool, AppError> {
    state
        .db_pool
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("audit log requires a database".into()))
}

fn database_error(err: sqlx::Error) -> AppError {
    AppError::Internal(format!("audit query failed: {err}"))
}

/// GET /v1/security/attempts: Rejected authentication and denied requests.
#[utoipa::path(
    get,
    path = "/v1/security/attempts",
    params(AttemptsQuery),
    responses(
        (status = 200, description = "Newest first", body = Vec<SecurityAttempt>),
        (status = 403, description = "Dean only", body = crate::error::ErrorBody),
    ),
    tag = "security"
)]
pub async fn list_attempts(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<AttemptsQuery>, QueryRejection>,
) -> Result<Json<Vec<SecurityAttempt>>, AppError> {
    require_role(&caller, Role::Dean)?;
    let limit = extract_query(query)?
        .limit
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT);
    Ok(Json(state.security_log.recent(limit)))
}

/// GET /v1/security/audit/events: Audit trail of one resource, oldest first.
#[utoipa::path(
    get,
    path = "/v1/security/audit/events",
    params(AuditEventsQuery),
    responses(
        (status = 200, description = "Oldest first", body = Vec<AuditEventRow>),
        (status = 403, description = "Dean only", body = crate::error::ErrorBody),
        (status = 503, description = "No database configured", body = crate::error::ErrorBody),
    ),
    tag = "security"
)]
pub async fn audit_events(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<AuditEventsQuery>, QueryRejection>,
) -> Result<Json<Vec<AuditEventRow>>, AppError> {
    require_role(&caller, Role::Dean)?;
    let query = extract_query(query)?;
    let pool = audit_pool(&state)?;
    let rows = audit::events_for_resource(pool, &query.resource_type, query.resource_id)
        .await
        .map_err(database_error)?;
    Ok(Json(rows))
}

/// GET /v1/security/audit/verify: Check hash continuity of the audit chain.
#[utoipa::path(
    get,
    path = "/v1/security/audit/verify",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Verification result", body = ChainIntegrityResult),
        (status = 403, description = "Dean only", body = crate::error::ErrorBody),
        (status = 503, description = "No database configured", body = crate::error::ErrorBody),
    ),
    tag = "security"
)]
pub async fn verify_audit_chain(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> Result<Json<ChainIntegrityResult>, AppError> {
    require_role(&caller, Role::Dean)?;
    let limit = extract_query(query)?
        .limit
        .unwrap_or(DEFAULT_VERIFY_LIMIT)
        .clamp(1, MAX_VERIFY_LIMIT);
    let pool = audit_pool(&state)?;
    let result = audit::verify_chain_integrity(pool, limit)
        .await
        .map_err(database_error)?;
    if !result.chain_valid {
        tracing::error!(
            broken_links = result.broken_links,
            tampered_events = result.tampered_events,
            "audit chain verification failed"
        );
    }
    Ok(Json(result))
}
