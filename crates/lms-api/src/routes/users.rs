//! # Users
//!
//! Teacher and student management plus the autocomplete used by the
//! assignment dialogs.
//!
//! - `POST /v1/users`: register a user (HOD+)
//! - `GET  /v1/users?role=&department_id=`: list users (Teacher+)
//! - `GET  /v1/users/search?q=&role=&limit=`: autocomplete (Teacher+)
//! - `GET  /v1/users/:user_id`: user details (Teacher+, or self)

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use lms_core::{validate_name, DepartmentId, Role, UserId};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::persist_user;
use crate::access::require_department_authority;
use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::state::{AppState, UserRecord};

const MAX_NAME_CHARS: usize = 120;
const MAX_EMAIL_CHARS: usize = 254;
const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_SEARCH_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    /// `student`, `teacher`, `course_coordinator` (or `cc`), `hod`, `dean`.
    pub role: String,
    /// Required for every role except `dean`.
    #[serde(default)]
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub department_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserResponse {
    fn from(u: &UserRecord) -> Self {
        Self {
            id: *u.id.as_uuid(),
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role.as_str().to_string(),
            department_id: u.department_id.map(|d| *d.as_uuid()),
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    pub role: Option<String>,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchUsersQuery {
    /// Case-insensitive text matched against names and emails.
    pub q: String,
    pub role: Option<String>,
    /// Default 10, at most 50.
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/users", post(create_user).get(list_users))
        .route("/v1/users/search", get(search_users))
        .route("/v1/users/:user_id", get(get_user))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/users: Register a user.
///
/// HODs may register students, teachers and coordinators in their own
/// department. Deans may register anyone.
#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (
            status = 403,
            description = "Not allowed to create this user",
            body = crate::error::ErrorBody,
        ),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    require_role(&caller, Role::Hod)?;
    let req = extract_json(body)?;

    let name = validate_name("name", &req.name, MAX_NAME_CHARS)?;
    let email = validate_email(&req.email)?;
    let role = Role::parse(&req.role)?;

    let department_id = match (role, req.department_id) {
        (Role::Dean, None) => None,
        (Role::Dean, Some(_)) => {
            return Err(AppError::Validation("deans do not belong to a department".into()))
        }
        (_, None) => {
            return Err(AppError::Validation(format!(
                "department_id is required for role '{role}'"
            )))
        }
        (_, Some(id)) => {
            if !state.departments.contains(&id) {
                return Err(AppError::Validation(format!("department {id} does not exist")));
            }
            Some(DepartmentId::from_uuid(id))
        }
    };

    if !caller.has_role(Role::Dean) {
        if role >= Role::Hod {
            return Err(AppError::Forbidden(format!(
                "only a dean may register a '{role}'"
            )));
        }
        if let Some(department_id) = department_id {
            require_department_authority(&state, &caller, department_id)?;
        }
    }

    let id = UserId::new();
    let record = UserRecord {
        id,
        name,
        email: email.clone(),
        role,
        department_id,
        created_at: Utc::now(),
    };
    let response = UserResponse::from(&record);
    state
        .users
        .insert_unless(*id.as_uuid(), record.clone(), |u| u.email == email)
        .map_err(|_| AppError::Conflict(format!("email {email} is already registered")))?;
    persist_user(&state, &record).await?;

    tracing::info!(user_id = %id, role = %role, "user registered");
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /v1/users: List users, optionally filtered by role and department.
#[utoipa::path(
    get,
    path = "/v1/users",
    params(ListUsersQuery),
    responses((status = 200, description = "Users ordered by name", body = Vec<UserResponse>)),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    require_role(&caller, Role::Teacher)?;
    let query = extract_query(query)?;
    let role = query.role.as_deref().map(Role::parse).transpose()?;
    let department = query.department_id.map(DepartmentId::from_uuid);

    let mut users = state.users.filter(|u| {
        role.map_or(true, |r| u.role == r)
            && department.map_or(true, |d| u.department_id == Some(d))
    });
    users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// GET /v1/users/search: Autocomplete by name or email.
///
/// Prefix matches (on any word of the name, or the email) rank before
/// substring matches; ties are ordered by name.
#[utoipa::path(
    get,
    path = "/v1/users/search",
    params(SearchUsersQuery),
    responses((status = 200, description = "Best matches first", body = Vec<UserResponse>)),
    tag = "users"
)]
pub async fn search_users(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<SearchUsersQuery>, QueryRejection>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    require_role(&caller, Role::Teacher)?;
    let query = extract_query(query)?;
    let role = query.role.as_deref().map(Role::parse).transpose()?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);

    let candidates = match role {
        Some(role) => state.users.filter(|u| u.role == role),
        None => state.users.list(),
    };
    let results = rank_matches(&candidates, &query.q, limit);
    Ok(Json(results.into_iter().map(UserResponse::from).collect()))
}

/// GET /v1/users/:user_id: User details.
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = UserId::from_uuid(user_id);
    if !caller.is_user(user_id) {
        require_role(&caller, Role::Teacher)?;
    }
    let record = state
        .user(user_id)
        .ok_or_else(|| AppError::NotFound(format!("{user_id} not found")))?;
    Ok(Json(UserResponse::from(&record)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_email(raw: &str) -> Result<String, AppError> {
    let email = validate_name("email", raw, MAX_EMAIL_CHARS)?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') =>
        {
            Ok(email)
        }
        _ => Err(AppError::Validation(format!("'{raw}' is not a valid email address"))),
    }
}

/// Rank users against an autocomplete query. 0 = prefix, 1 = substring.
fn match_rank(user: &UserRecord, needle: &str) -> Option<u8> {
    let name = user.name.to_lowercase();
    let prefix = name.split_whitespace().any(|word| word.starts_with(needle))
        || name.starts_with(needle)
        || user.email.starts_with(needle);
    if prefix {
        Some(0)
    } else if name.contains(needle) || user.email.contains(needle) {
        Some(1)
    } else {
        None
    }
}

fn rank_matches<'a>(users: &'a [UserRecord], query: &str, limit: usize) -> Vec<&'a UserRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let mut ranked: Vec<(u8, String, &UserRecord)> = users
        .iter()
        .filter_map(|u| match_rank(u, &needle).map(|rank| (rank, u.name.to_lowercase(), u)))
        .collect();
    ranked.sort_by(|a, b| (a.0, &a.1, a.2.id).cmp(&(b.0, &b.1, b.2.id)));
    ranked.into_iter().take(limit).map(|(_, _, u)| u).collect()
}
