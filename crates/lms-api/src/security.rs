//! # Security-Attempt Log
//!
//! Bounded in-memory record of rejected authentication and denied
//! authorization. Every entry is also emitted with `tracing::warn!`.
//! The oldest entries are evicted past [`MAX_ATTEMPTS`].

use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use lms_core::UserId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::DeniedReason;

/// Capacity of the in-memory log.
pub const MAX_ATTEMPTS: usize = 10_000;

/// Category of a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    /// No `Authorization` header.
    MissingCredentials,
    /// Header present but not a Bearer token.
    InvalidScheme,
    /// Bearer token malformed or secret wrong.
    InvalidToken,
    /// Authenticated caller denied by role or scope (403).
    Forbidden,
}

/// One rejected request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SecurityAttempt {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub kind: AttemptKind,
    pub method: String,
    pub path: String,
    /// Role of the caller, when authentication succeeded.
    pub role: Option<String>,
    #[schema(value_type = Option<Uuid>)]
    pub user_id: Option<UserId>,
    pub detail: String,
}

/// Shared, bounded security-attempt log.
#[derive(Debug, Clone)]
pub struct SecurityLog {
    entries: Arc<Mutex<VecDeque<SecurityAttempt>>>,
    capacity: usize,
}

impl SecurityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    /// Append an attempt, evicting the oldest past capacity.
    pub fn record(
        &self,
        kind: AttemptKind,
        method: &str,
        path: &str,
        caller: Option<&CallerIdentity>,
        detail: &str,
    ) {
        tracing::warn!(
            kind = ?kind,
            method,
            path,
            role = caller.map(|c| c.role.as_str()),
            user_id = caller.and_then(|c| c.user_id).map(|u| u.to_string()),
            detail,
            "security attempt recorded"
        );
        let attempt = SecurityAttempt {
            id: Uuid::new_v4(),
            at: Utc::now(),
            kind,
            method: method.to_string(),
            path: path.to_string(),
            role: caller.map(|c| c.role.as_str().to_string()),
            user_id: caller.and_then(|c| c.user_id),
            detail: detail.to_string(),
        };
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(attempt);
    }

    /// Newest first, at most `limit` entries.
    pub fn recent(&self, limit: usize) -> Vec<SecurityAttempt> {
        self.entries.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SecurityLog {
    fn default() -> Self {
        Self::with_capacity(MAX_ATTEMPTS)
    }
}

/// Middleware that records every 403 response in the security log.
///
/// Runs inside the auth middleware so the caller identity is available.
pub async fn record_denials(request: Request, next: Next) -> Response {
    let log = request.extensions().get::<SecurityLog>().cloned();
    let caller = request.extensions().get::<CallerIdentity>().cloned();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    if response.status() == StatusCode::FORBIDDEN {
        if let Some(log) = log {
            let detail = response
                .extensions()
                .get::<DeniedReason>()
                .map(|r| r.0.clone())
                .unwrap_or_else(|| "forbidden".to_string());
            log.record(AttemptKind::Forbidden, &method, &path, caller.as_ref(), &detail);
        }
    }

    response
}
