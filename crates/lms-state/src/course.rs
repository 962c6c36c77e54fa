//! # Course Lifecycle
//!
//! ```text
//! DRAFT ──launch──▶ LAUNCHED ──archive──▶ ARCHIVED (terminal)
//!   ▲                  │
//!   └──── withdraw ────┘
//! ```
//!
//! A course can only launch once its arrangement has an approved snapshot.
//! Later revisions of the arrangement do not affect a launched course until
//! they are approved, at which point students see the new order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lms_core::{validate_name, CourseId, DepartmentId, Timestamp, UserId, ValidationError};

use crate::arrangement::ContentArrangement;

const MAX_CODE_CHARS: usize = 32;
const MAX_TITLE_CHARS: usize = 200;

// ─── Course State ────────────────────────────────────────────────────

/// Lifecycle state of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseState {
    Draft,
    Launched,
    Archived,
}

impl CourseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Launched => "LAUNCHED",
            Self::Archived => "ARCHIVED",
        }
    }

    pub fn valid_transitions(&self) -> &'static [CourseState] {
        match self {
            Self::Draft => &[Self::Launched, Self::Archived],
            Self::Launched => &[Self::Draft, Self::Archived],
            Self::Archived => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Archived)
    }
}

impl std::fmt::Display for CourseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a course lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseTransitionRecord {
    pub from_state: CourseState,
    pub to_state: CourseState,
    pub at: Timestamp,
    pub actor: Option<UserId>,
}

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CourseError {
    #[error("invalid course transition: {from} -> {to}")]
    InvalidTransition { from: CourseState, to: CourseState },

    /// Launch attempted before any arrangement version was approved.
    #[error("course cannot launch without an approved content arrangement")]
    NoApprovedArrangement,

    #[error("arrangement belongs to course {found}, expected {expected}")]
    ArrangementMismatch { expected: CourseId, found: CourseId },

    #[error("course is archived")]
    Archived,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

// ─── Course ──────────────────────────────────────────────────────────

/// A course offered by a department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    /// Short unique code, stored upper-case (e.g. `CS101`).
    pub code: String,
    pub title: String,
    pub department_id: DepartmentId,
    pub coordinator_id: Option<UserId>,
    pub state: CourseState,
    /// Arrangement version that was published when the course launched.
    pub launched_version: Option<u32>,
    pub launched_at: Option<Timestamp>,
    pub transitions: Vec<CourseTransitionRecord>,
    pub created_at: Timestamp,
}

impl Course {
    /// Create a draft course. Code and title are trimmed; the code is
    /// upper-cased.
    pub fn new(code: &str, title: &str, department_id: DepartmentId) -> Result<Self, CourseError> {
        let code = validate_name("code", code, MAX_CODE_CHARS)?.to_ascii_uppercase();
        let title = validate_name("title", title, MAX_TITLE_CHARS)?;
        Ok(Self {
            id: CourseId::new(),
            code,
            title,
            department_id,
            coordinator_id: None,
            state: CourseState::Draft,
            launched_version: None,
            launched_at: None,
            transitions: Vec::new(),
            created_at: Timestamp::now(),
        })
    }

    /// Set or replace the course coordinator. Not allowed once archived.
    pub fn assign_coordinator(&mut self, coordinator: UserId) -> Result<(), CourseError> {
        if self.state.is_terminal() {
            return Err(CourseError::Archived);
        }
        self.coordinator_id = Some(coordinator);
        Ok(())
    }

    /// DRAFT → LAUNCHED. The arrangement must belong to this course and have
    /// an approved snapshot.
    pub fn launch(
        &mut self,
        arrangement: &ContentArrangement,
        actor: Option<UserId>,
    ) -> Result<(), CourseError> {
        self.require_transition(CourseState::Launched)?;
        if arrangement.course_id != self.id {
            return Err(CourseError::ArrangementMismatch {
                expected: self.id,
                found: arrangement.course_id,
            });
        }
        let published = arrangement
            .published()
            .ok_or(CourseError::NoApprovedArrangement)?;
        self.launched_version = Some(published.version);
        self.launched_at = Some(Timestamp::now());
        self.do_transition(CourseState::Launched, actor);
        Ok(())
    }

    /// LAUNCHED → DRAFT. Students lose access until relaunch.
    pub fn withdraw(&mut self, actor: Option<UserId>) -> Result<(), CourseError> {
        self.require_transition(CourseState::Draft)?;
        self.launched_at = None;
        self.do_transition(CourseState::Draft, actor);
        Ok(())
    }

    /// Any non-terminal state → ARCHIVED.
    pub fn archive(&mut self, actor: Option<UserId>) -> Result<(), CourseError> {
        self.require_transition(CourseState::Archived)?;
        self.do_transition(CourseState::Archived, actor);
        Ok(())
    }

    pub fn is_launched(&self) -> bool {
        self.state == CourseState::Launched
    }

    fn require_transition(&self, to: CourseState) -> Result<(), CourseError> {
        if self.state.valid_transitions().contains(&to) {
            Ok(())
        } else {
            Err(CourseError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }

    fn do_transition(&mut self, to: CourseState, actor: Option<UserId>) {
        self.transitions.push(CourseTransitionRecord {
            from_state: self.state,
            to_state: to,
            at: Timestamp::now(),
            actor,
        });
        self.state = to;
    }
}
