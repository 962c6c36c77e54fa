//! # lms-state: Workflow State Machines
//!
//! ## State Machines
//!
//! - **Content Arrangement** (`arrangement.rs`): the per-course, versioned,
//!   orderable list of videos and documents.
//!   `Open → Submitted → Approved | Rejected`, with `Rejected → Open` and
//!   `Approved → Open` to start the next revision. The version counter moves
//!   on every submit; each submit leaves a snapshot in the history.
//!
//! - **Course** (`course.rs`): `Draft → Launched → Archived`, with
//!   `Launched → Draft` for withdrawal. Launch requires an approved
//!   arrangement snapshot.
//!
//! ## Design
//!
//! Both machines are enums with validated transitions. Every method that
//! changes state returns `Result` with a structured error naming the current
//! state and the attempted target, and appends a transition record.

pub mod arrangement;
pub mod course;

pub use arrangement::{
    ArrangementError, ArrangementSnapshot, ArrangementState, ArrangementTransitionRecord,
    ContentArrangement, ContentItem, ContentKind, ReviewOutcome, MAX_ITEMS,
};
pub use course::{Course, CourseError, CourseState, CourseTransitionRecord};
