//! # Analytics Dashboards
//!
//! Read-only aggregates computed from the in-memory stores on request.
//!
//! - `GET /v1/analytics/department/:department_id` (HOD of the department, Dean)
//! - `GET /v1/analytics/school` (Dean)
//! - `GET /v1/analytics/teacher` (the calling teacher)

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use lms_core::{DepartmentId, Role};
use lms_state::{ArrangementState, CourseState};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::access::require_department_authority;
use crate::auth::{require_role, require_user, CallerIdentity};
use crate::error::AppError;
use crate::state::{AppState, DepartmentRecord};

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CourseCounts {
    pub draft: usize,
    pub launched: usize,
    pub archived: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ArrangementCounts {
    pub open: usize,
    pub submitted: usize,
    pub approved: usize,
    pub rejected: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Summary {
    pub courses: CourseCounts,
    pub arrangements: ArrangementCounts,
    /// Arrangements waiting for HOD review.
    pub pending_reviews: usize,
    pub sections: usize,
    /// Teachers and course coordinators.
    pub teachers: usize,
    pub students: usize,
    /// Sum of section roster sizes. A student in two sections counts twice.
    pub enrollments: usize,
}

impl Summary {
    fn add(&mut self, other: &Summary) {
        self.courses.draft += other.courses.draft;
        self.courses.launched += other.courses.launched;
        self.courses.archived += other.courses.archived;
        self.arrangements.open += other.arrangements.open;
        self.arrangements.submitted += other.arrangements.submitted;
        self.arrangements.approved += other.arrangements.approved;
        self.arrangements.rejected += other.arrangements.rejected;
        self.pending_reviews += other.pending_reviews;
        self.sections += other.sections;
        self.teachers += other.teachers;
        self.students += other.students;
        self.enrollments += other.enrollments;
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DepartmentAnalytics {
    pub department_id: Uuid,
    pub name: String,
    pub school: String,
    pub summary: Summary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SchoolAnalytics {
    /// Ordered by department name.
    pub departments: Vec<DepartmentAnalytics>,
    pub totals: Summary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeacherSection {
    pub section_id: Uuid,
    pub name: String,
    pub course_id: Uuid,
    pub course_code: String,
    pub course_state: String,
    pub students: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CoordinatedCourse {
    pub course_id: Uuid,
    pub code: String,
    pub course_state: String,
    pub arrangement_state: String,
    pub arrangement_version: u32,
    pub items: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeacherAnalytics {
    pub teacher_id: Uuid,
    pub sections: Vec<TeacherSection>,
    pub total_students: usize,
    pub coordinated_courses: Vec<CoordinatedCourse>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/analytics/department/:department_id", get(department_dashboard))
        .route("/v1/analytics/school", get(school_dashboard))
        .route("/v1/analytics/teacher", get(teacher_dashboard))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /v1/analytics/department/:department_id: HOD dashboard.
#[utoipa::path(
    get,
    path = "/v1/analytics/department/{department_id}",
    params(("department_id" = Uuid, Path, description = "Department UUID")),
    responses(
        (status = 200, description = "Department summary", body = DepartmentAnalytics),
        (status = 403, description = "Not HOD of the department", body = crate::error::ErrorBody),
        (status = 404, description = "Department not found", body = crate::error::ErrorBody),
    ),
    tag = "analytics"
)]
pub async fn department_dashboard(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(department_id): Path<Uuid>,
) -> Result<Json<DepartmentAnalytics>, AppError> {
    require_role(&caller, Role::Hod)?;
    let department = state
        .departments
        .get(&department_id)
        .ok_or_else(|| AppError::NotFound(format!("department {department_id} not found")))?;
    require_department_authority(&state, &caller, department.id)?;
    Ok(Json(department_analytics(&state, &department)))
}

/// GET /v1/analytics/school: Dean dashboard across departments.
#[utoipa::path(
    get,
    path = "/v1/analytics/school",
    responses(
        (status = 200, description = "Per-department summaries and totals", body = SchoolAnalytics),
        (status = 403, description = "Dean only", body = crate::error::ErrorBody),
    ),
    tag = "analytics"
)]
pub async fn school_dashboard(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<SchoolAnalytics>, AppError> {
    require_role(&caller, Role::Dean)?;
    let mut departments = state.departments.list();
    departments.sort_by(|a, b| a.name.cmp(&b.name));

    let departments: Vec<DepartmentAnalytics> = departments
        .iter()
        .map(|d| department_analytics(&state, d))
        .collect();
    let mut totals = Summary::default();
    for d in &departments {
        totals.add(&d.summary);
    }
    Ok(Json(SchoolAnalytics { departments, totals }))
}

/// GET /v1/analytics/teacher: The caller's sections and coordinated courses.
#[utoipa::path(
    get,
    path = "/v1/analytics/teacher",
    responses(
        (status = 200, description = "Teacher dashboard", body = TeacherAnalytics),
        (status = 403, description = "Teachers only", body = crate::error::ErrorBody),
    ),
    tag = "analytics"
)]
pub async fn teacher_dashboard(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<TeacherAnalytics>, AppError> {
    require_role(&caller, Role::Teacher)?;
    let teacher = require_user(&caller)?;

    let mut sections: Vec<TeacherSection> = state
        .sections
        .filter(|s| s.teacher_id == Some(teacher))
        .into_iter()
        .filter_map(|s| {
            let course = state.course(s.course_id)?;
            Some(TeacherSection {
                section_id: *s.id.as_uuid(),
                name: s.name.clone(),
                course_id: *course.id.as_uuid(),
                course_code: course.code,
                course_state: course.state.as_str().to_string(),
                students: s.student_ids.len(),
            })
        })
        .collect();
    sections.sort_by(|a, b| (&a.course_code, &a.name).cmp(&(&b.course_code, &b.name)));
    let total_students = sections.iter().map(|s| s.students).sum();

    let mut coordinated_courses: Vec<CoordinatedCourse> = state
        .courses
        .filter(|c| c.coordinator_id == Some(teacher))
        .into_iter()
        .filter_map(|c| {
            let arrangement = state.arrangements.get(c.id.as_uuid())?;
            Some(CoordinatedCourse {
                course_id: *c.id.as_uuid(),
                code: c.code,
                course_state: c.state.as_str().to_string(),
                arrangement_state: arrangement.state.as_str().to_string(),
                arrangement_version: arrangement.version,
                items: arrangement.items.len(),
            })
        })
        .collect();
    coordinated_courses.sort_by(|a, b| a.code.cmp(&b.code));

    Ok(Json(TeacherAnalytics {
        teacher_id: *teacher.as_uuid(),
        sections,
        total_students,
        coordinated_courses,
    }))
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

fn department_analytics(state: &AppState, department: &DepartmentRecord) -> DepartmentAnalytics {
    DepartmentAnalytics {
        department_id: *department.id.as_uuid(),
        name: department.name.clone(),
        school: department.school.clone(),
        summary: summarize(state, department.id),
    }
}

fn summarize(state: &AppState, department_id: DepartmentId) -> Summary {
    let mut summary = Summary::default();

    for course in state.courses.filter(|c| c.department_id == department_id) {
        match course.state {
            CourseState::Draft => summary.courses.draft += 1,
            CourseState::Launched => summary.courses.launched += 1,
            CourseState::Archived => summary.courses.archived += 1,
        }
        if let Some(arrangement) = state.arrangements.get(course.id.as_uuid()) {
            match arrangement.state {
                ArrangementState::Open => summary.arrangements.open += 1,
                ArrangementState::Submitted => summary.arrangements.submitted += 1,
                ArrangementState::Approved => summary.arrangements.approved += 1,
                ArrangementState::Rejected => summary.arrangements.rejected += 1,
            }
            if arrangement.is_pending_review() {
                summary.pending_reviews += 1;
            }
        }
        for section in state.sections_of(course.id) {
            summary.sections += 1;
            summary.enrollments += section.student_ids.len();
        }
    }

    for user in state.users.filter(|u| u.department_id == Some(department_id)) {
        if user.role.is_teaching_staff() {
            summary.teachers += 1;
        } else if user.role == Role::Student {
            summary.students += 1;
        }
    }
    summary
}
