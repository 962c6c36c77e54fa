//! # Role Hierarchy
//!
//! Institutional roles ordered by privilege. The derived `Ord` follows
//! declaration order, so `caller.role >= Role::Hod` is the whole access check.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Roles in the LMS, ordered by privilege level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Enrolled learner. Sees launched course content only.
    Student,
    /// Teaches one or more sections.
    Teacher,
    /// Teacher responsible for arranging a course's content order (CC).
    CourseCoordinator,
    /// Head of Department. Reviews arrangements and launches courses.
    Hod,
    /// School-level administrator with cross-department visibility.
    Dean,
}

impl Role {
    /// All roles in ascending privilege order.
    pub const ALL: [Role; 5] = [
        Role::Student,
        Role::Teacher,
        Role::CourseCoordinator,
        Role::Hod,
        Role::Dean,
    ];

    /// Canonical string form, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::CourseCoordinator => "course_coordinator",
            Self::Hod => "hod",
            Self::Dean => "dean",
        }
    }

    /// Parse a role name. Accepts the canonical names and the `cc` alias,
    /// case-insensitively.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            "course_coordinator" | "cc" => Ok(Self::CourseCoordinator),
            "hod" => Ok(Self::Hod),
            "dean" => Ok(Self::Dean),
            _ => Err(ValidationError::UnknownRole(s.to_string())),
        }
    }

    /// Whether this role teaches (and may therefore coordinate or own a section).
    pub fn is_teaching_staff(&self) -> bool {
        matches!(self, Self::Teacher | Self::CourseCoordinator)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_privilege() {
        assert!(Role::Student < Role::Teacher);
        assert!(Role::Teacher < Role::CourseCoordinator);
        assert!(Role::CourseCoordinator < Role::Hod);
        assert!(Role::Hod < Role::Dean);
    }

    #[test]
    fn parse_accepts_alias_and_case() {
        assert_eq!(Role::parse("CC").unwrap(), Role::CourseCoordinator);
        assert_eq!(Role::parse(" Hod ").unwrap(), Role::Hod);
        assert!(Role::parse("registrar").is_err());
    }

    #[test]
    fn as_str_matches_serde() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn teaching_staff() {
        assert!(Role::Teacher.is_teaching_staff());
        assert!(Role::CourseCoordinator.is_teaching_staff());
        assert!(!Role::Student.is_teaching_staff());
        assert!(!Role::Hod.is_teaching_staff());
    }
}
