//! # Departments
//!
//! - `POST /v1/departments`: create a department (Dean)
//! - `GET  /v1/departments`: list departments

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use lms_core::{validate_name, DepartmentId, Role};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::persist_department;
use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, DepartmentRecord};

const MAX_NAME_CHARS: usize = 120;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateDepartmentRequest {
    pub name: String,
    /// School (faculty) the department belongs to.
    pub school: String,
}

impl Validate for CreateDepartmentRequest {
    fn validate(&self) -> Result<(), String> {
        validate_name("name", &self.name, MAX_NAME_CHARS).map_err(|e| e.to_string())?;
        validate_name("school", &self.school, MAX_NAME_CHARS).map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DepartmentResponse {
    pub id: Uuid,
    pub name: String,
    pub school: String,
    pub created_at: DateTime<Utc>,
}

impl From<&DepartmentRecord> for DepartmentResponse {
    fn from(d: &DepartmentRecord) -> Self {
        Self {
            id: *d.id.as_uuid(),
            name: d.name.clone(),
            school: d.school.clone(),
            created_at: d.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/departments", post(create_department).get(list_departments))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/departments: Create a department.
#[utoipa::path(
    post,
    path = "/v1/departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = DepartmentResponse),
        (status = 403, description = "Dean only", body = crate::error::ErrorBody),
        (status = 409, description = "Name already used", body = crate::error::ErrorBody),
    ),
    tag = "departments"
)]
pub async fn create_department(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateDepartmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DepartmentResponse>), AppError> {
    require_role(&caller, Role::Dean)?;
    let req = extract_validated_json(body)?;

    let id = DepartmentId::new();
    let record = DepartmentRecord {
        id,
        name: validate_name("name", &req.name, MAX_NAME_CHARS)?,
        school: validate_name("school", &req.school, MAX_NAME_CHARS)?,
        created_at: Utc::now(),
    };
    let response = DepartmentResponse::from(&record);
    let name = record.name.to_lowercase();
    state
        .departments
        .insert_unless(*id.as_uuid(), record.clone(), |d| d.name.to_lowercase() == name)
        .map_err(|existing| {
            AppError::Conflict(format!("department '{}' already exists", existing.name))
        })?;
    persist_department(&state, &record).await?;

    tracing::info!(department_id = %id, name = %response.name, "department created");
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /v1/departments: List departments by name.
#[utoipa::path(
    get,
    path = "/v1/departments",
    responses((status = 200, description = "Departments", body = Vec<DepartmentResponse>)),
    tag = "departments"
)]
pub async fn list_departments(
    State(state): State<AppState>,
    _caller: CallerIdentity,
) -> Json<Vec<DepartmentResponse>> {
    let mut departments: Vec<DepartmentResponse> =
        state.departments.list().iter().map(DepartmentResponse::from).collect();
    departments.sort_by(|a, b| a.name.cmp(&b.name));
    Json(departments)
}
