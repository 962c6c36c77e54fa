//! # Sections
//!
//! Teaching groups of a course: one teacher, many enrolled students.
//!
//! - `POST   /v1/sections`: create a section (HOD)
//! - `GET    /v1/sections?course_id=&teacher_id=`: list sections
//! - `GET    /v1/sections/:section_id`: section details with roster
//! - `PUT    /v1/sections/:section_id/teacher`: assign the teacher (HOD)
//! - `POST   /v1/sections/:section_id/students`: enroll students (HOD)
//! - `DELETE /v1/sections/:section_id/students/:student_id`: unenroll (HOD)

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use lms_core::{validate_name, CourseId, Role, SectionId, UserId};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::persist_section;
use crate::access::{
    load_course, load_section, require_department_authority, require_section_member,
};
use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::state::{AppState, SectionRecord};

const MAX_NAME_CHARS: usize = 80;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateSectionRequest {
    pub course_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub teacher_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AssignTeacherRequest {
    pub teacher_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct EnrollRequest {
    pub student_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SectionResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub name: String,
    pub teacher_id: Option<Uuid>,
    pub student_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&SectionRecord> for SectionResponse {
    fn from(s: &SectionRecord) -> Self {
        Self {
            id: *s.id.as_uuid(),
            course_id: *s.course_id.as_uuid(),
            name: s.name.clone(),
            teacher_id: s.teacher_id.map(|t| *t.as_uuid()),
            student_ids: s.student_ids.iter().map(|u| *u.as_uuid()).collect(),
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListSectionsQuery {
    pub course_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sections", post(create_section).get(list_sections))
        .route("/v1/sections/:section_id", get(get_section))
        .route("/v1/sections/:section_id/teacher", put(assign_teacher))
        .route("/v1/sections/:section_id/students", post(enroll_students))
        .route(
            "/v1/sections/:section_id/students/:student_id",
            delete(unenroll_student),
        )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/sections: Create a section of a course.
#[utoipa::path(
    post,
    path = "/v1/sections",
    request_body = CreateSectionRequest,
    responses(
        (status = 201, description = "Section created", body = SectionResponse),
        (
            status = 403,
            description = "Not HOD of the course's department",
            body = crate::error::ErrorBody,
        ),
        (
            status = 409,
            description = "Name already used in this course",
            body = crate::error::ErrorBody,
        ),
    ),
    tag = "sections"
)]
pub async fn create_section(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateSectionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SectionResponse>), AppError> {
    let req = extract_json(body)?;
    let course = load_course(&state, req.course_id)
        .map_err(|_| AppError::Validation(format!("course {} does not exist", req.course_id)))?;
    require_department_authority(&state, &caller, course.department_id)?;
    if course.state.is_terminal() {
        return Err(AppError::Conflict(format!("course {} is archived", course.code)));
    }

    let name = validate_name("name", &req.name, MAX_NAME_CHARS)?;
    let teacher_id = req
        .teacher_id
        .map(|t| validate_teacher(&state, UserId::from_uuid(t)))
        .transpose()?;

    let id = SectionId::new();
    let record = SectionRecord {
        id,
        course_id: course.id,
        name: name.clone(),
        teacher_id,
        student_ids: Vec::new(),
        created_at: Utc::now(),
    };
    let response = SectionResponse::from(&record);
    let lowered = name.to_lowercase();
    state
        .sections
        .insert_unless(*id.as_uuid(), record.clone(), |s| {
            s.course_id == course.id && s.name.to_lowercase() == lowered
        })
        .map_err(|_| {
            AppError::Conflict(format!("{} already has a section named '{name}'", course.code))
        })?;
    persist_section(&state, &record).await?;

    tracing::info!(section_id = %id, course_id = %course.id, "section created");
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /v1/sections: List sections.
///
/// Teachers and above see every section matching the filters. Students see
/// the sections they are enrolled in.
#[utoipa::path(
    get,
    path = "/v1/sections",
    params(ListSectionsQuery),
    responses(
        (status = 200, description = "Sections ordered by name", body = Vec<SectionResponse>),
    ),
    tag = "sections"
)]
pub async fn list_sections(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<ListSectionsQuery>, QueryRejection>,
) -> Result<Json<Vec<SectionResponse>>, AppError> {
    let query = extract_query(query)?;
    let course = query.course_id.map(CourseId::from_uuid);
    let teacher = query.teacher_id.map(UserId::from_uuid);
    let student = if caller.has_role(Role::Teacher) {
        None
    } else {
        Some(crate::auth::require_user(&caller)?)
    };

    let mut sections = state.sections.filter(|s| {
        course.map_or(true, |c| s.course_id == c)
            && teacher.map_or(true, |t| s.teacher_id == Some(t))
            && student.map_or(true, |u| s.student_ids.contains(&u))
    });
    sections.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(Json(sections.iter().map(SectionResponse::from).collect()))
}

/// GET /v1/sections/:section_id: Section details.
#[utoipa::path(
    get,
    path = "/v1/sections/{section_id}",
    params(("section_id" = Uuid, Path, description = "Section UUID")),
    responses(
        (status = 200, description = "Section", body = SectionResponse),
        (status = 403, description = "Not a member", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "sections"
)]
pub async fn get_section(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(section_id): Path<Uuid>,
) -> Result<Json<SectionResponse>, AppError> {
    let section = load_section(&state, section_id)?;
    if !caller.has_role(Role::Teacher) {
        require_section_member(&state, &caller, &section)?;
    }
    Ok(Json(SectionResponse::from(&section)))
}

/// PUT /v1/sections/:section_id/teacher: Assign the section teacher.
#[utoipa::path(
    put,
    path = "/v1/sections/{section_id}/teacher",
    params(("section_id" = Uuid, Path, description = "Section UUID")),
    request_body = AssignTeacherRequest,
    responses(
        (status = 200, description = "Teacher assigned", body = SectionResponse),
        (status = 422, description = "User is not teaching staff", body = crate::error::ErrorBody),
    ),
    tag = "sections"
)]
pub async fn assign_teacher(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(section_id): Path<Uuid>,
    body: Result<Json<AssignTeacherRequest>, JsonRejection>,
) -> Result<Json<SectionResponse>, AppError> {
    let req = extract_json(body)?;
    authorize_roster_change(&state, &caller, section_id)?;
    let teacher = validate_teacher(&state, UserId::from_uuid(req.teacher_id))?;

    let updated = state
        .sections
        .update(&section_id, |s| s.teacher_id = Some(teacher))
        .ok_or_else(|| AppError::NotFound(format!("section {section_id} not found")))?;
    persist_section(&state, &updated).await?;
    tracing::info!(section_id = %updated.id, teacher_id = %teacher, "section teacher assigned");
    Ok(Json(SectionResponse::from(&updated)))
}

/// POST /v1/sections/:section_id/students: Enroll students.
///
/// Already-enrolled students are left as they are.
#[utoipa::path(
    post,
    path = "/v1/sections/{section_id}/students",
    params(("section_id" = Uuid, Path, description = "Section UUID")),
    request_body = EnrollRequest,
    responses(
        (status = 200, description = "Roster after enrollment", body = SectionResponse),
        (
            status = 422,
            description = "Unknown user or not a student",
            body = crate::error::ErrorBody,
        ),
    ),
    tag = "sections"
)]
pub async fn enroll_students(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(section_id): Path<Uuid>,
    body: Result<Json<EnrollRequest>, JsonRejection>,
) -> Result<Json<SectionResponse>, AppError> {
    let req = extract_json(body)?;
    authorize_roster_change(&state, &caller, section_id)?;

    let mut students = Vec::with_capacity(req.student_ids.len());
    for raw in req.student_ids {
        let id = UserId::from_uuid(raw);
        let user = state
            .user(id)
            .ok_or_else(|| AppError::Validation(format!("{id} does not exist")))?;
        if user.role != Role::Student {
            return Err(AppError::Validation(format!(
                "{} is a {}, only students can be enrolled",
                user.name, user.role
            )));
        }
        students.push(id);
    }

    let updated = state
        .sections
        .update(&section_id, |s| {
            for id in &students {
                if !s.student_ids.contains(id) {
                    s.student_ids.push(*id);
                }
            }
        })
        .ok_or_else(|| AppError::NotFound(format!("section {section_id} not found")))?;
    persist_section(&state, &updated).await?;
    tracing::info!(
        section_id = %updated.id,
        enrolled = updated.student_ids.len(),
        "students enrolled"
    );
    Ok(Json(SectionResponse::from(&updated)))
}

/// DELETE /v1/sections/:section_id/students/:student_id: Unenroll a student.
#[utoipa::path(
    delete,
    path = "/v1/sections/{section_id}/students/{student_id}",
    params(
        ("section_id" = Uuid, Path, description = "Section UUID"),
        ("student_id" = Uuid, Path, description = "Student UUID"),
    ),
    responses(
        (status = 200, description = "Roster after removal", body = SectionResponse),
        (status = 404, description = "Student not enrolled", body = crate::error::ErrorBody),
    ),
    tag = "sections"
)]
pub async fn unenroll_student(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((section_id, student_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SectionResponse>, AppError> {
    authorize_roster_change(&state, &caller, section_id)?;
    let student = UserId::from_uuid(student_id);

    let updated = state
        .sections
        .try_update(&section_id, |s| {
            let before = s.student_ids.len();
            s.student_ids.retain(|u| *u != student);
            if s.student_ids.len() == before {
                Err(AppError::NotFound(format!("{student} is not enrolled in {}", s.name)))
            } else {
                Ok(s.clone())
            }
        })
        .ok_or_else(|| AppError::NotFound(format!("section {section_id} not found")))??;
    persist_section(&state, &updated).await?;
    Ok(Json(SectionResponse::from(&updated)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// HOD of the section's course department, or Dean.
fn authorize_roster_change(
    state: &AppState,
    caller: &CallerIdentity,
    section_id: Uuid,
) -> Result<(), AppError> {
    require_role(caller, Role::Hod)?;
    let section = load_section(state, section_id)?;
    let course = load_course(state, *section.course_id.as_uuid())?;
    require_department_authority(state, caller, course.department_id)
}

fn validate_teacher(state: &AppState, user_id: UserId) -> Result<UserId, AppError> {
    let user = state
        .user(user_id)
        .ok_or_else(|| AppError::Validation(format!("{user_id} does not exist")))?;
    if user.role.is_teaching_staff() {
        Ok(user_id)
    } else {
        Err(AppError::Validation(format!(
            "{} is a {}, only teaching staff can teach a section",
            user.name, user.role
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{send, token, Fixture};
    use serde_json::json;

    #[tokio::test]
    async fn hod_creates_section_and_enrolls() {
        let fx = Fixture::new();
        let app = fx.app();
        let hod = token(Role::Hod, fx.hod);
        let course = fx.create_course("CS101");

        let (status, body) = send(
            &app,
            "POST",
            "/v1/sections",
            Some(&hod),
            Some(json!({
                "course_id": course.as_uuid(),
                "name": "A",
                "teacher_id": fx.teacher.as_uuid(),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let students = json!({"student_ids": [fx.student.as_uuid(), fx.student2.as_uuid()]});
        let uri = format!("/v1/sections/{id}/students");
        let (status, body) = send(&app, "POST", &uri, Some(&hod), Some(students.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["student_ids"].as_array().unwrap().len(), 2);

        let (status, body) = send(&app, "POST", &uri, Some(&hod), Some(students)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["student_ids"].as_array().unwrap().len(), 2, "enrollment is idempotent");

        let (status, body) = send(
            &app,
            "DELETE",
            &format!("/v1/sections/{id}/students/{}", fx.student2.as_uuid()),
            Some(&hod),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["student_ids"], json!([fx.student.as_uuid()]));

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/v1/sections/{id}/students/{}", fx.student2.as_uuid()),
            Some(&hod),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_section_name_conflicts() {
        let fx = Fixture::new();
        let course = fx.create_course("CS101");
        fx.create_section(course, "A", None, &[]);
        let (status, _) = send(
            &fx.app(),
            "POST",
            "/v1/sections",
            Some(&token(Role::Hod, fx.hod)),
            Some(json!({"course_id": course.as_uuid(), "name": "a"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn only_students_can_enroll_and_only_staff_can_teach() {
        let fx = Fixture::new();
        let app = fx.app();
        let hod = token(Role::Hod, fx.hod);
        let section = fx.create_section(fx.create_course("CS101"), "A", None, &[]);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/v1/sections/{}/students", section.as_uuid()),
            Some(&hod),
            Some(json!({"student_ids": [fx.teacher.as_uuid()]})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/v1/sections/{}/teacher", section.as_uuid()),
            Some(&hod),
            Some(json!({"teacher_id": fx.student.as_uuid()})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/v1/sections/{}/teacher", section.as_uuid()),
            Some(&hod),
            Some(json!({"teacher_id": fx.cc.as_uuid()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["teacher_id"], fx.cc.as_uuid().to_string());
    }

    #[tokio::test]
    async fn roster_changes_are_department_scoped() {
        let fx = Fixture::new();
        let section = fx.create_section(fx.create_course("CS101"), "A", None, &[]);
        let (status, _) = send(
            &fx.app(),
            "POST",
            &format!("/v1/sections/{}/students", section.as_uuid()),
            Some(&token(Role::Hod, fx.other_hod)),
            Some(json!({"student_ids": [fx.student.as_uuid()]})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn students_list_only_their_sections() {
        let fx = Fixture::new();
        let app = fx.app();
        let course = fx.create_course("CS101");
        let mine = fx.create_section(course, "A", Some(fx.teacher), &[fx.student]);
        let other = fx.create_section(course, "B", Some(fx.teacher), &[fx.student2]);
        let student = token(Role::Student, fx.student);

        let (status, body) = send(&app, "GET", "/v1/sections", Some(&student), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], mine.as_uuid().to_string());

        let (status, _) = send(
            &app,
            "GET",
            &format!("/v1/sections/{}", other.as_uuid()),
            Some(&student),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            "GET",
            &format!("/v1/sections?teacher_id={}", fx.teacher.as_uuid()),
            Some(&token(Role::Teacher, fx.teacher)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }
}
