//! # Resource-Scoped Authorization
//!
//! Role checks live in [`crate::auth`]. The checks here also look at the
//! resource: which department a course belongs to, who coordinates it, who
//! teaches or attends a section.

use lms_core::{DepartmentId, Role};
use lms_state::Course;
use uuid::Uuid;

use crate::auth::{require_role, require_user, CallerIdentity};
use crate::error::AppError;
use crate::state::{AppState, SectionRecord, UserRecord};

/// Fetch a course or 404.
pub fn load_course(state: &AppState, course_id: Uuid) -> Result<Course, AppError> {
    state
        .courses
        .get(&course_id)
        .ok_or_else(|| AppError::NotFound(format!("course {course_id} not found")))
}

/// Fetch a section or 404.
pub fn load_section(state: &AppState, section_id: Uuid) -> Result<SectionRecord, AppError> {
    state
        .sections
        .get(&section_id)
        .ok_or_else(|| AppError::NotFound(format!("section {section_id} not found")))
}

/// The caller's directory record. Service identities have none.
pub fn caller_record(state: &AppState, caller: &CallerIdentity) -> Result<UserRecord, AppError> {
    let user_id = require_user(caller)?;
    state
        .user(user_id)
        .ok_or_else(|| AppError::Forbidden(format!("{user_id} is not a registered user")))
}

/// HOD of `department_id`, or Dean.
pub fn require_department_authority(
    state: &AppState,
    caller: &CallerIdentity,
    department_id: DepartmentId,
) -> Result<(), AppError> {
    require_role(caller, Role::Hod)?;
    if caller.has_role(Role::Dean) {
        return Ok(());
    }
    let user = caller_record(state, caller)?;
    if user.department_id == Some(department_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "caller is not HOD of {department_id}"
        )))
    }
}

/// Coordinator-level actions on a course's arrangement: the assigned
/// coordinator, or an HOD/Dean with authority over the department.
pub fn require_coordinator(
    state: &AppState,
    caller: &CallerIdentity,
    course: &Course,
) -> Result<(), AppError> {
    if caller.has_role(Role::Hod) {
        return require_department_authority(state, caller, course.department_id);
    }
    require_role(caller, Role::Teacher)?;
    match (caller.user_id, course.coordinator_id) {
        (Some(user), Some(coordinator)) if user == coordinator => Ok(()),
        _ => Err(AppError::Forbidden(format!(
            "only the coordinator of {} may change its arrangement",
            course.code
        ))),
    }
}

/// Read access to a section's roster and conversation: its teacher, its
/// students, the course coordinator, or HOD and above.
pub fn require_section_member(
    state: &AppState,
    caller: &CallerIdentity,
    section: &SectionRecord,
) -> Result<(), AppError> {
    if caller.has_role(Role::Hod) {
        return Ok(());
    }
    let user = require_user(caller)?;
    if section.is_member(user) {
        return Ok(());
    }
    let coordinates = state
        .course(section.course_id)
        .is_some_and(|c| c.coordinator_id == Some(user));
    if coordinates {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "caller is not a member of section {}",
            section.name
        )))
    }
}
