//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from lms-state and lms-core to HTTP status codes and
//! JSON bodies. Internal error details are never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lms_state::{ArrangementError, CourseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "CONFLICT").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Reason attached to 403 responses so the security log can record it
/// without re-parsing the body.
#[derive(Debug, Clone)]
pub struct DeniedReason(pub String);

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A dependency (database) is unavailable (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500). Logged, never returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::ServiceUnavailable(_) => "Service temporarily unavailable".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "dependency unavailable"),
            _ => {}
        }

        let denied = match &self {
            Self::Forbidden(reason) => Some(DeniedReason(reason.clone())),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(reason) = denied {
            response.extensions_mut().insert(reason);
        }
        response
    }
}

impl From<lms_core::ValidationError> for AppError {
    fn from(err: lms_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ArrangementError> for AppError {
    fn from(err: ArrangementError) -> Self {
        match &err {
            ArrangementError::InvalidTransition { .. }
            | ArrangementError::NotEditable { .. }
            | ArrangementError::EmptySubmission => Self::Conflict(err.to_string()),
            ArrangementError::ItemNotFound(_) => Self::NotFound(err.to_string()),
            ArrangementError::IndexOutOfRange { .. }
            | ArrangementError::OrderMismatch(_)
            | ArrangementError::TooManyItems { .. }
            | ArrangementError::RemarksRequired
            | ArrangementError::InvalidItem(_)
            | ArrangementError::DurationOnDocument => Self::Validation(err.to_string()),
        }
    }
}

impl From<CourseError> for AppError {
    fn from(err: CourseError) -> Self {
        match &err {
            CourseError::InvalidTransition { .. }
            | CourseError::NoApprovedArrangement
            | CourseError::Archived => Self::Conflict(err.to_string()),
            CourseError::Invalid(_) => Self::Validation(err.to_string()),
            CourseError::ArrangementMismatch { .. } => Self::Internal(err.to_string()),
        }
    }
}
