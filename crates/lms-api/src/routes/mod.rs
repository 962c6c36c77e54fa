//! # API Route Modules
//!
//! - `departments`: department directory.
//! - `users`: teacher and student management, autocomplete search.
//! - `courses`: course lifecycle (create, coordinator, launch, withdraw, archive).
//! - `arrangements`: content arrangement editing, review workflow, history,
//!   and the student content view.
//! - `sections`: sections, teacher assignment, enrollment.
//! - `notifications`: per-user inbox fed by the workflow.
//! - `chat`: section conversations.
//! - `analytics`: department, school and teacher dashboards.
//! - `export`: CSV downloads.
//! - `security`: security-attempt log for deans.

pub mod analytics;
pub mod arrangements;
pub mod chat;
pub mod courses;
pub mod departments;
pub mod export;
pub mod notifications;
pub mod sections;
pub mod security;
pub mod users;

use lms_state::{ContentArrangement, Course};
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::db;
use crate::error::AppError;
use crate::state::{AppState, DepartmentRecord, SectionRecord, UserRecord};

// ---------------------------------------------------------------------------
// Write-through persistence
// ---------------------------------------------------------------------------

fn persist_failed(kind: &str, id: Uuid, err: sqlx::Error) -> AppError {
    tracing::error!(id = %id, error = %err, "failed to persist {kind}");
    AppError::Internal(format!("{kind} updated in-memory but database persist failed"))
}

pub(crate) async fn persist_department(
    state: &AppState,
    department: &DepartmentRecord,
) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        db::departments::upsert(pool, department)
            .await
            .map_err(|e| persist_failed("department", *department.id.as_uuid(), e))?;
    }
    Ok(())
}

pub(crate) async fn persist_user(state: &AppState, user: &UserRecord) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        db::users::upsert(pool, user)
            .await
            .map_err(|e| persist_failed("user", *user.id.as_uuid(), e))?;
    }
    Ok(())
}

pub(crate) async fn persist_section(
    state: &AppState,
    section: &SectionRecord,
) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        db::sections::upsert(pool, section)
            .await
            .map_err(|e| persist_failed("section", *section.id.as_uuid(), e))?;
    }
    Ok(())
}

pub(crate) async fn persist_course(state: &AppState, course: &Course) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        db::courses::upsert(pool, course)
            .await
            .map_err(|e| persist_failed("course", *course.id.as_uuid(), e))?;
    }
    Ok(())
}

pub(crate) async fn persist_arrangement(
    state: &AppState,
    arrangement: &ContentArrangement,
) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        db::arrangements::upsert(pool, arrangement)
            .await
            .map_err(|e| persist_failed("arrangement", *arrangement.course_id.as_uuid(), e))?;
    }
    Ok(())
}

/// Append a workflow event to the audit chain. Failures are logged, not returned.
pub(crate) async fn record_audit(
    state: &AppState,
    caller: &CallerIdentity,
    resource_type: &str,
    resource_id: Uuid,
    action: &str,
    metadata: serde_json::Value,
) {
    tracing::info!(
        resource_type,
        resource_id = %resource_id,
        action,
        role = caller.role.as_str(),
        "workflow event"
    );
    if let Some(pool) = &state.db_pool {
        let event = db::audit::AuditEvent {
            event_type: format!("{resource_type}.{action}"),
            actor: Some(
                caller
                    .user_id
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "service".to_string()),
            ),
            resource_type: resource_type.to_string(),
            resource_id,
            action: action.to_string(),
            metadata,
        };
        if let Err(e) = db::audit::append(pool, event).await {
            tracing::warn!(error = %e, resource_id = %resource_id, "failed to append audit event");
        }
    }
}

// ---------------------------------------------------------------------------
// Test fixture shared by route and helper tests
// ---------------------------------------------------------------------------
