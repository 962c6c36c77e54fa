//! # CSV Export
//!
//! - `GET /v1/export/sections/:section_id/students.csv`: roster (`id,name,email`)
//! - `GET /v1/export/courses.csv?department_id=`: course catalogue with
//!   arrangement status

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use lms_core::{DepartmentId, Role};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::access::{
    caller_record, load_course, load_section, require_department_authority, require_section_member,
};
use crate::auth::{require_role, CallerIdentity};
use crate::csv::CsvDocument;
use crate::error::AppError;
use crate::extractors::extract_query;
use crate::state::AppState;

const ROSTER_COLUMNS: [&str; 3] = ["id", "name", "email"];
const COURSE_COLUMNS: [&str; 7] = [
    "code",
    "title",
    "department",
    "state",
    "arrangement_state",
    "arrangement_version",
    "items",
];

#[derive(Debug, Deserialize, IntoParams)]
pub struct CoursesExportQuery {
    /// Restrict to one department. HODs default to their own.
    pub department_id: Option<Uuid>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/export/sections/:section_id/students.csv",
            get(export_section_students),
        )
        .route("/v1/export/courses.csv", get(export_courses))
}

/// GET /v1/export/sections/:section_id/students.csv: Section roster.
#[utoipa::path(
    get,
    path = "/v1/export/sections/{section_id}/students.csv",
    params(("section_id" = Uuid, Path, description = "Section UUID")),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv"),
        (status = 403, description = "Not staff of the section", body = crate::error::ErrorBody),
    ),
    tag = "export"
)]
pub async fn export_section_students(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(section_id): Path<Uuid>,
) -> Result<Response, AppError> {
    require_role(&caller, Role::Teacher)?;
    let section = load_section(&state, section_id)?;
    require_section_member(&state, &caller, &section)?;
    let course = load_course(&state, *section.course_id.as_uuid())?;

    let mut students: Vec<_> = section
        .student_ids
        .iter()
        .filter_map(|id| state.user(*id))
        .collect();
    students.sort_by(|a, b| a.name.cmp(&b.name));

    let mut doc = CsvDocument::new(&ROSTER_COLUMNS);
    for student in &students {
        doc.push_row([
            student.id.as_uuid().to_string(),
            student.name.clone(),
            student.email.clone(),
        ]);
    }
    tracing::info!(section_id = %section.id, rows = students.len(), "roster exported");
    Ok(doc.into_download(&format!("{}-{}-students.csv", course.code, section.name)))
}

/// GET /v1/export/courses.csv: Course catalogue.
#[utoipa::path(
    get,
    path = "/v1/export/courses.csv",
    params(CoursesExportQuery),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv"),
        (status = 403, description = "HOD or Dean only", body = crate::error::ErrorBody),
    ),
    tag = "export"
)]
pub async fn export_courses(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<CoursesExportQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    require_role(&caller, Role::Hod)?;
    let query = extract_query(query)?;

    let department: Option<DepartmentId> = match query.department_id {
        Some(id) => {
            let id = DepartmentId::from_uuid(id);
            require_department_authority(&state, &caller, id)?;
            Some(id)
        }
        None if caller.has_role(Role::Dean) => None,
        None => caller_record(&state, &caller)?.department_id,
    };

    let mut courses = state
        .courses
        .filter(|c| department.map_or(true, |d| c.department_id == d));
    courses.sort_by(|a, b| a.code.cmp(&b.code));

    let mut doc = CsvDocument::new(&COURSE_COLUMNS);
    for course in &courses {
        let department_name = state
            .departments
            .get(course.department_id.as_uuid())
            .map(|d| d.name)
            .unwrap_or_default();
        let arrangement = state.arrangements.get(course.id.as_uuid());
        doc.push_row([
            course.code.clone(),
            course.title.clone(),
            department_name,
            course.state.as_str().to_string(),
            arrangement
                .as_ref()
                .map(|a| a.state.as_str().to_string())
                .unwrap_or_default(),
            arrangement
                .as_ref()
                .map(|a| a.version.to_string())
                .unwrap_or_default(),
            arrangement
                .as_ref()
                .map(|a| a.items.len().to_string())
                .unwrap_or_default(),
        ]);
    }
    tracing::info!(rows = courses.len(), "course catalogue exported");
    Ok(doc.into_download("courses.csv"))
}
