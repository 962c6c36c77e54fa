//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented handler into one spec, served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "LMS API",
        version = "0.1.0",
        description = "Role-based learning management backend: departments, users, courses, \
            content arrangement approval, sections, notifications, chat, analytics and CSV export.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Directory
        crate::routes::departments::create_department,
        crate::routes::departments::list_departments,
        crate::routes::users::create_user,
        crate::routes::users::list_users,
        crate::routes::users::search_users,
        crate::routes::users::get_user,
        // Courses
        crate::routes::courses::create_course,
        crate::routes::courses::list_courses,
        crate::routes::courses::get_course,
        crate::routes::courses::assign_coordinator,
        crate::routes::courses::launch_course,
        crate::routes::courses::withdraw_course,
        crate::routes::courses::archive_course,
        // Content arrangement
        crate::routes::arrangements::get_arrangement,
        crate::routes::arrangements::history,
        crate::routes::arrangements::course_content,
        crate::routes::arrangements::add_item,
        crate::routes::arrangements::rename_item,
        crate::routes::arrangements::remove_item,
        crate::routes::arrangements::move_item,
        crate::routes::arrangements::set_order,
        crate::routes::arrangements::submit,
        crate::routes::arrangements::approve,
        crate::routes::arrangements::reject,
        crate::routes::arrangements::reopen,
        // Sections
        crate::routes::sections::create_section,
        crate::routes::sections::list_sections,
        crate::routes::sections::get_section,
        crate::routes::sections::assign_teacher,
        crate::routes::sections::enroll_students,
        crate::routes::sections::unenroll_student,
        crate::routes::chat::post_message,
        crate::routes::chat::list_messages,
        // Notifications
        crate::routes::notifications::list_notifications,
        crate::routes::notifications::mark_read,
        crate::routes::notifications::mark_all_read,
        // Dashboards
        crate::routes::analytics::department_dashboard,
        crate::routes::analytics::school_dashboard,
        crate::routes::analytics::teacher_dashboard,
        // Export
        crate::routes::export::export_section_students,
        crate::routes::export::export_courses,
        // Security
        crate::routes::security::list_attempts,
        crate::routes::security::audit_events,
        crate::routes::security::verify_audit_chain,
    ),
    components(schemas(
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Directory DTOs
        crate::routes::departments::CreateDepartmentRequest,
        crate::routes::departments::DepartmentResponse,
        crate::routes::users::CreateUserRequest,
        crate::routes::users::UserResponse,
        // Course DTOs
        crate::routes::courses::CreateCourseRequest,
        crate::routes::courses::AssignCoordinatorRequest,
        crate::routes::courses::ArrangementSummary,
        crate::routes::courses::CourseResponse,
        // Arrangement DTOs
        crate::routes::arrangements::AddItemRequest,
        crate::routes::arrangements::RenameItemRequest,
        crate::routes::arrangements::MoveItemRequest,
        crate::routes::arrangements::SetOrderRequest,
        crate::routes::arrangements::ApproveRequest,
        crate::routes::arrangements::RejectRequest,
        crate::routes::arrangements::ContentItemResponse,
        crate::routes::arrangements::ArrangementResponse,
        crate::routes::arrangements::SnapshotResponse,
        crate::routes::arrangements::TransitionResponse,
        crate::routes::arrangements::HistoryResponse,
        crate::routes::arrangements::CourseContentResponse,
        // Section DTOs
        crate::routes::sections::CreateSectionRequest,
        crate::routes::sections::AssignTeacherRequest,
        crate::routes::sections::EnrollRequest,
        crate::routes::sections::SectionResponse,
        crate::routes::chat::PostMessageRequest,
        crate::routes::chat::MessageResponse,
        // Notification DTOs
        crate::routes::notifications::NotificationResponse,
        crate::routes::notifications::ReadAllResponse,
        // Dashboard DTOs
        crate::routes::analytics::CourseCounts,
        crate::routes::analytics::ArrangementCounts,
        crate::routes::analytics::Summary,
        crate::routes::analytics::DepartmentAnalytics,
        crate::routes::analytics::SchoolAnalytics,
        crate::routes::analytics::TeacherSection,
        crate::routes::analytics::CoordinatedCourse,
        crate::routes::analytics::TeacherAnalytics,
        // Operations
        crate::security::SecurityAttempt,
        crate::security::AttemptKind,
        crate::db::audit::AuditEventRow,
        crate::db::audit::ChainIntegrityResult,
        crate::middleware::metrics::MetricsSnapshot,
    )),
    tags(
        (name = "departments", description = "Departments"),
        (name = "users", description = "User directory and autocomplete"),
        (name = "courses", description = "Course lifecycle"),
        (name = "arrangements", description = "Content arrangement editing and approval"),
        (name = "sections", description = "Sections, teachers and enrollment"),
        (name = "chat", description = "Section chat"),
        (name = "notifications", description = "Workflow notifications"),
        (name = "analytics", description = "Dean, HOD and Teacher dashboards"),
        (name = "export", description = "CSV export"),
        (name = "security", description = "Rejected request log and audit chain"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_the_workflow_paths() {
        let spec = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = spec["paths"].as_object().unwrap();
        for path in [
            "/v1/courses",
            "/v1/courses/{course_id}/arrangement",
            "/v1/courses/{course_id}/arrangement/submit",
            "/v1/courses/{course_id}/arrangement/approve",
            "/v1/courses/{course_id}/arrangement/reject",
            "/v1/courses/{course_id}/launch",
            "/v1/courses/{course_id}/content",
            "/v1/export/courses.csv",
            "/v1/security/attempts",
            "/v1/security/audit/verify",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        assert!(spec["components"]["schemas"]["ArrangementResponse"].is_object());
        assert!(spec["components"]["schemas"]["ErrorBody"].is_object());
    }

    #[test]
    fn every_tag_is_declared() {
        let spec = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let declared: Vec<&str> = spec["tags"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        for op in spec["paths"]
            .as_object()
            .unwrap()
            .values()
            .flat_map(|item| item.as_object().unwrap().values())
        {
            for tag in op["tags"].as_array().into_iter().flatten() {
                let tag = tag.as_str().unwrap();
                assert!(declared.contains(&tag), "undeclared tag {tag}");
            }
        }
    }
}
