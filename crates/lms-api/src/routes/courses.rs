//! # Courses
//!
//! Course lifecycle. Every course owns exactly one content arrangement,
//! created alongside it.
//!
//! - `POST /v1/courses`: create a draft course (HOD)
//! - `GET  /v1/courses?department_id=&state=`: list courses
//! - `GET  /v1/courses/:course_id`: course details
//! - `PUT  /v1/courses/:course_id/coordinator`: assign the coordinator (HOD)
//! - `POST /v1/courses/:course_id/launch`: publish to students (HOD)
//! - `POST /v1/courses/:course_id/withdraw`: back to draft (HOD)
//! - `POST /v1/courses/:course_id/archive`: retire the course (HOD)

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use lms_core::{DepartmentId, Role, UserId};
use lms_state::{ContentArrangement, Course, CourseState};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{persist_arrangement, persist_course, record_audit};
use crate::access::{load_course, require_department_authority};
use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::notify::{course_audience, notify};
use crate::state::{AppState, NotificationKind};

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCourseRequest {
    /// Unique course code, stored upper-case.
    pub code: String,
    pub title: String,
    pub department_id: Uuid,
    #[serde(default)]
    pub coordinator_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AssignCoordinatorRequest {
    pub coordinator_id: Uuid,
}

/// Arrangement state as seen from the course listing.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ArrangementSummary {
    pub state: String,
    pub version: u32,
    pub items: usize,
    /// Latest approved version, the one students see once launched.
    pub published_version: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CourseResponse {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub department_id: Uuid,
    pub coordinator_id: Option<Uuid>,
    pub state: String,
    pub launched_version: Option<u32>,
    pub launched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub arrangement: Option<ArrangementSummary>,
}

impl CourseResponse {
    pub(crate) fn build(course: &Course, arrangement: Option<&ContentArrangement>) -> Self {
        Self {
            id: *course.id.as_uuid(),
            code: course.code.clone(),
            title: course.title.clone(),
            department_id: *course.department_id.as_uuid(),
            coordinator_id: course.coordinator_id.map(|c| *c.as_uuid()),
            state: course.state.as_str().to_string(),
            launched_version: course.launched_version,
            launched_at: course.launched_at.map(|t| *t.as_datetime()),
            created_at: *course.created_at.as_datetime(),
            arrangement: arrangement.map(|a| ArrangementSummary {
                state: a.state.as_str().to_string(),
                version: a.version,
                items: a.items.len(),
                published_version: a.published().map(|s| s.version),
            }),
        }
    }

    fn for_course(state: &AppState, course: &Course) -> Self {
        let arrangement = state.arrangements.get(course.id.as_uuid());
        Self::build(course, arrangement.as_ref())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListCoursesQuery {
    pub department_id: Option<Uuid>,
    /// `draft`, `launched` or `archived`.
    pub state: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/courses", post(create_course).get(list_courses))
        .route("/v1/courses/:course_id", get(get_course))
        .route("/v1/courses/:course_id/coordinator", put(assign_coordinator))
        .route("/v1/courses/:course_id/launch", post(launch_course))
        .route("/v1/courses/:course_id/withdraw", post(withdraw_course))
        .route("/v1/courses/:course_id/archive", post(archive_course))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/courses: Create a draft course and its open arrangement.
#[utoipa::path(
    post,
    path = "/v1/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 403, description = "Not HOD of the department", body = crate::error::ErrorBody),
        (status = 409, description = "Course code already used", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorBody),
    ),
    tag = "courses"
)]
pub async fn create_course(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateCourseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CourseResponse>), AppError> {
    let req = extract_json(body)?;
    if !state.departments.contains(&req.department_id) {
        return Err(AppError::Validation(format!(
            "department {} does not exist",
            req.department_id
        )));
    }
    let department_id = DepartmentId::from_uuid(req.department_id);
    require_department_authority(&state, &caller, department_id)?;

    let mut course = Course::new(&req.code, &req.title, department_id)?;
    if let Some(coordinator) = req.coordinator_id {
        let coordinator = validate_coordinator(&state, UserId::from_uuid(coordinator))?;
        course.assign_coordinator(coordinator)?;
    }

    let code = course.code.clone();
    state
        .courses
        .insert_unless(*course.id.as_uuid(), course.clone(), |c| c.code == code)
        .map_err(|_| AppError::Conflict(format!("course code {code} is already used")))?;
    let arrangement = ContentArrangement::new(course.id);
    state
        .arrangements
        .insert(*course.id.as_uuid(), arrangement.clone());

    persist_course(&state, &course).await?;
    persist_arrangement(&state, &arrangement).await?;
    record_audit(
        &state,
        &caller,
        "course",
        *course.id.as_uuid(),
        "create",
        serde_json::json!({ "code": course.code }),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(CourseResponse::build(&course, Some(&arrangement))),
    ))
}

/// GET /v1/courses: List courses, ordered by code.
#[utoipa::path(
    get,
    path = "/v1/courses",
    params(ListCoursesQuery),
    responses((status = 200, description = "Courses", body = Vec<CourseResponse>)),
    tag = "courses"
)]
pub async fn list_courses(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<ListCoursesQuery>, QueryRejection>,
) -> Result<Json<Vec<CourseResponse>>, AppError> {
    require_role(&caller, Role::Teacher)?;
    let query = extract_query(query)?;
    let wanted_state = query
        .state
        .as_deref()
        .map(parse_course_state)
        .transpose()?;
    let department = query.department_id.map(DepartmentId::from_uuid);

    let mut courses = state.courses.filter(|c| {
        department.map_or(true, |d| c.department_id == d)
            && wanted_state.map_or(true, |s| c.state == s)
    });
    courses.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(Json(
        courses
            .iter()
            .map(|c| CourseResponse::for_course(&state, c))
            .collect(),
    ))
}

/// GET /v1/courses/:course_id: Course details.
///
/// Students see launched courses only.
#[utoipa::path(
    get,
    path = "/v1/courses/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    responses(
        (status = 200, description = "Course", body = CourseResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "courses"
)]
pub async fn get_course(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseResponse>, AppError> {
    let course = load_course(&state, course_id)?;
    if !caller.has_role(Role::Teacher) && !course.is_launched() {
        return Err(AppError::NotFound(format!("course {course_id} not found")));
    }
    Ok(Json(CourseResponse::for_course(&state, &course)))
}

/// PUT /v1/courses/:course_id/coordinator: Assign the course coordinator.
#[utoipa::path(
    put,
    path = "/v1/courses/{course_id}/coordinator",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    request_body = AssignCoordinatorRequest,
    responses(
        (status = 200, description = "Coordinator assigned", body = CourseResponse),
        (status = 409, description = "Course archived", body = crate::error::ErrorBody),
        (status = 422, description = "User cannot coordinate", body = crate::error::ErrorBody),
    ),
    tag = "courses"
)]
pub async fn assign_coordinator(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
    body: Result<Json<AssignCoordinatorRequest>, JsonRejection>,
) -> Result<Json<CourseResponse>, AppError> {
    let req = extract_json(body)?;
    let course = load_course(&state, course_id)?;
    require_department_authority(&state, &caller, course.department_id)?;
    let coordinator = validate_coordinator(&state, UserId::from_uuid(req.coordinator_id))?;

    let updated = state
        .courses
        .try_update(&course_id, |c| {
            c.assign_coordinator(coordinator)?;
            Ok::<_, AppError>(c.clone())
        })
        .ok_or_else(|| AppError::NotFound(format!("course {course_id} not found")))??;

    persist_course(&state, &updated).await?;
    record_audit(
        &state,
        &caller,
        "course",
        course_id,
        "assign_coordinator",
        serde_json::json!({ "coordinator_id": coordinator.as_uuid() }),
    )
    .await;
    Ok(Json(CourseResponse::for_course(&state, &updated)))
}

/// POST /v1/courses/:course_id/launch: Publish the approved arrangement.
#[utoipa::path(
    post,
    path = "/v1/courses/{course_id}/launch",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    responses(
        (status = 200, description = "Course launched", body = CourseResponse),
        (
            status = 409,
            description = "Not in DRAFT or no approved arrangement",
            body = crate::error::ErrorBody,
        ),
    ),
    tag = "courses"
)]
pub async fn launch_course(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseResponse>, AppError> {
    let course = load_course(&state, course_id)?;
    require_department_authority(&state, &caller, course.department_id)?;
    let arrangement = state
        .arrangements
        .get(&course_id)
        .ok_or_else(|| AppError::Internal(format!("course {course_id} has no arrangement")))?;

    let updated = state
        .courses
        .try_update(&course_id, |c| {
            c.launch(&arrangement, caller.user_id)?;
            Ok::<_, AppError>(c.clone())
        })
        .ok_or_else(|| AppError::NotFound(format!("course {course_id} not found")))??;

    persist_course(&state, &updated).await?;
    record_audit(
        &state,
        &caller,
        "course",
        course_id,
        "launch",
        serde_json::json!({ "version": updated.launched_version }),
    )
    .await;
    notify(
        &state,
        course_audience(&state, &updated),
        NotificationKind::CourseLaunched,
        &updated,
        &format!("{} is now live", updated.code),
    );
    tracing::info!(course_id = %updated.id, version = ?updated.launched_version, "course launched");
    Ok(Json(CourseResponse::build(&updated, Some(&arrangement))))
}

/// POST /v1/courses/:course_id/withdraw: Take a launched course back to draft.
#[utoipa::path(
    post,
    path = "/v1/courses/{course_id}/withdraw",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    responses(
        (status = 200, description = "Course withdrawn", body = CourseResponse),
        (status = 409, description = "Course not launched", body = crate::error::ErrorBody),
    ),
    tag = "courses"
)]
pub async fn withdraw_course(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseResponse>, AppError> {
    transition(&state, &caller, course_id, "withdraw", |c, actor| c.withdraw(actor)).await
}

/// POST /v1/courses/:course_id/archive: Archive a course. Terminal.
#[utoipa::path(
    post,
    path = "/v1/courses/{course_id}/archive",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    responses(
        (status = 200, description = "Course archived", body = CourseResponse),
        (status = 409, description = "Already archived", body = crate::error::ErrorBody),
    ),
    tag = "courses"
)]
pub async fn archive_course(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseResponse>, AppError> {
    transition(&state, &caller, course_id, "archive", |c, actor| c.archive(actor)).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn transition(
    state: &AppState,
    caller: &CallerIdentity,
    course_id: Uuid,
    action: &str,
    apply: impl FnOnce(&mut Course, Option<UserId>) -> Result<(), lms_state::CourseError>,
) -> Result<Json<CourseResponse>, AppError> {
    let course = load_course(state, course_id)?;
    require_department_authority(state, caller, course.department_id)?;

    let updated = state
        .courses
        .try_update(&course_id, |c| {
            apply(c, caller.user_id)?;
            Ok::<_, AppError>(c.clone())
        })
        .ok_or_else(|| AppError::NotFound(format!("course {course_id} not found")))??;

    persist_course(state, &updated).await?;
    record_audit(
        state,
        caller,
        "course",
        course_id,
        action,
        serde_json::json!({ "state": updated.state.as_str() }),
    )
    .await;
    Ok(Json(CourseResponse::for_course(state, &updated)))
}

/// Coordinators must be registered teaching staff.
fn validate_coordinator(state: &AppState, user_id: UserId) -> Result<UserId, AppError> {
    let user = state
        .user(user_id)
        .ok_or_else(|| AppError::Validation(format!("{user_id} does not exist")))?;
    if user.role.is_teaching_staff() {
        Ok(user_id)
    } else {
        Err(AppError::Validation(format!(
            "{} is a {}, only teachers and course coordinators can coordinate",
            user.name, user.role
        )))
    }
}

fn parse_course_state(s: &str) -> Result<CourseState, AppError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "draft" => Ok(CourseState::Draft),
        "launched" => Ok(CourseState::Launched),
        "archived" => Ok(CourseState::Archived),
        other => Err(AppError::Validation(format!("unknown course state '{other}'"))),
    }
}
