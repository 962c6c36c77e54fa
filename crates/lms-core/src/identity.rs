//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier in the LMS. They prevent accidental
//! identifier confusion: a handler that expects a `CourseId` will not accept a
//! `SectionId` pulled from the wrong path segment.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $ty:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $ty(Uuid);

        impl $ty {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for an academic department.
    DepartmentId,
    "department"
);

uuid_identifier!(
    /// Unique identifier for a user (dean, HOD, teacher, or student).
    UserId,
    "user"
);

uuid_identifier!(
    /// Unique identifier for a course.
    CourseId,
    "course"
);

uuid_identifier!(
    /// Unique identifier for a teaching section of a course.
    SectionId,
    "section"
);

uuid_identifier!(
    /// Stable identifier of a video or document inside an arrangement.
    ///
    /// Survives reordering and is carried into every version snapshot.
    ContentItemId,
    "item"
);
