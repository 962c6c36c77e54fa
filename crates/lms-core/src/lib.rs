//! # lms-core: Foundational Types for the LMS
//!
//! Defines the primitives every other crate in the workspace shares:
//!
//! 1. **Newtype identifiers.** `DepartmentId`, `UserId`, `CourseId`,
//!    `SectionId`, `ContentItemId`. You cannot pass a `SectionId` where a
//!    `CourseId` is expected.
//!
//! 2. **A single `Role` enum.** Ordered by privilege so access checks are a
//!    single comparison: `Student < Teacher < CourseCoordinator < Hod < Dean`.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lms-*` crates (leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod role;
pub mod temporal;

pub use error::{validate_name, ValidationError};
pub use identity::{ContentItemId, CourseId, DepartmentId, SectionId, UserId};
pub use role::Role;
pub use temporal::Timestamp;
