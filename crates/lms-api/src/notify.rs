//! # Workflow Notifications
//!
//! Fan-out of in-app notifications when an arrangement is submitted,
//! reviewed, or when a course launches. Each inbox keeps at most
//! [`MAX_NOTIFICATIONS_PER_USER`] entries; the oldest are dropped first.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use lms_core::{DepartmentId, Role, UserId};
use lms_state::Course;
use uuid::Uuid;

use crate::state::{AppState, NotificationKind, NotificationRecord};

pub const MAX_NOTIFICATIONS_PER_USER: usize = 200;

/// Create one notification per distinct recipient. Returns how many were created.
pub fn notify(
    state: &AppState,
    recipients: impl IntoIterator<Item = UserId>,
    kind: NotificationKind,
    course: &Course,
    message: &str,
) -> usize {
    let mut seen = HashSet::new();
    for recipient in recipients {
        if !seen.insert(recipient) {
            continue;
        }
        let id = Uuid::new_v4();
        state.notifications.insert(
            id,
            NotificationRecord {
                id,
                recipient_id: recipient,
                kind,
                course_id: course.id,
                message: message.to_string(),
                read: false,
                created_at: Utc::now(),
            },
        );
    }
    tracing::debug!(
        course_id = %course.id,
        kind = ?kind,
        recipients = seen.len(),
        "notifications created"
    );
    trim_inboxes(state, &seen);
    seen.len()
}

/// Drop the oldest notifications of each recipient beyond the inbox cap.
fn trim_inboxes(state: &AppState, recipients: &HashSet<UserId>) {
    let mut inboxes: HashMap<UserId, Vec<NotificationRecord>> = HashMap::new();
    for n in state
        .notifications
        .filter(|n| recipients.contains(&n.recipient_id))
    {
        inboxes.entry(n.recipient_id).or_default().push(n);
    }

    for (recipient, mut inbox) in inboxes {
        if inbox.len() <= MAX_NOTIFICATIONS_PER_USER {
            continue;
        }
        inbox.sort_by_key(|n| n.created_at);
        let excess = inbox.len() - MAX_NOTIFICATIONS_PER_USER;
        for n in &inbox[..excess] {
            state.notifications.remove(&n.id);
        }
        tracing::debug!(recipient = %recipient, evicted = excess, "inbox trimmed");
    }
}

/// HODs of a department.
pub fn department_hods(state: &AppState, department_id: DepartmentId) -> Vec<UserId> {
    state
        .users
        .filter(|u| u.role == Role::Hod && u.department_id == Some(department_id))
        .into_iter()
        .map(|u| u.id)
        .collect()
}

/// Everyone affected by a course launch: coordinator, section teachers and
/// enrolled students.
pub fn course_audience(state: &AppState, course: &Course) -> Vec<UserId> {
    let mut audience: Vec<UserId> = course.coordinator_id.into_iter().collect();
    for section in state.sections_of(course.id) {
        audience.extend(section.teacher_id);
        audience.extend(section.student_ids.iter().copied());
    }
    audience
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::Fixture;

    #[test]
    fn notify_deduplicates_recipients() {
        let fx = Fixture::new();
        let course = fx.state.course(fx.create_course("CS101")).unwrap();
        let created = notify(
            &fx.state,
            [fx.cc, fx.cc, fx.teacher],
            NotificationKind::CourseLaunched,
            &course,
            "launched",
        );
        assert_eq!(created, 2);
        assert_eq!(fx.state.notifications.len(), 2);
    }

    #[test]
    fn inboxes_are_capped_oldest_first() {
        let fx = Fixture::new();
        let course = fx.state.course(fx.create_course("CS101")).unwrap();
        let stale = Uuid::new_v4();
        fx.state.notifications.insert(
            stale,
            NotificationRecord {
                id: stale,
                recipient_id: fx.cc,
                kind: NotificationKind::ArrangementApproved,
                course_id: course.id,
                message: "stale".into(),
                read: true,
                created_at: Utc::now() - chrono::Duration::days(30),
            },
        );

        for i in 0..MAX_NOTIFICATIONS_PER_USER + 4 {
            notify(&fx.state, [fx.cc], NotificationKind::CourseLaunched, &course, &format!("n{i}"));
        }
        notify(&fx.state, [fx.teacher], NotificationKind::CourseLaunched, &course, "only one");

        let inbox = fx.state.notifications.filter(|n| n.recipient_id == fx.cc);
        assert_eq!(inbox.len(), MAX_NOTIFICATIONS_PER_USER);
        assert!(!fx.state.notifications.contains(&stale));
        assert_eq!(fx.state.notifications.filter(|n| n.recipient_id == fx.teacher).len(), 1);
    }

    #[test]
    fn audience_includes_sections() {
        let fx = Fixture::new();
        let course_id = fx.create_course("CS101");
        fx.create_section(course_id, "A", Some(fx.teacher), &[fx.student]);
        let course = fx.state.course(course_id).unwrap();
        let audience = course_audience(&fx.state, &course);
        assert!(audience.contains(&fx.cc));
        assert!(audience.contains(&fx.teacher));
        assert!(audience.contains(&fx.student));
    }

    #[test]
    fn hods_are_department_scoped() {
        let fx = Fixture::new();
        assert_eq!(department_hods(&fx.state, fx.department), vec![fx.hod]);
    }
}
