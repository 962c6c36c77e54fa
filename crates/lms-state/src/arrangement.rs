//! # Content Arrangement State Machine
//!
//! A course's videos and documents in the order students will see them,
//! gated by HOD approval.
//!
//! ## States
//!
//! ```text
//!   ┌──────────────────── reopen ───────────────────┐
//!   ▼                                               │
//! OPEN ──submit──▶ SUBMITTED ──approve──▶ APPROVED ─┘
//!   ▲                  │
//!   │                  └──reject──▶ REJECTED
//!   └────────── reopen ──────────────────┘
//! ```
//!
//! There is exactly one arrangement per course, so there is never more than
//! one open working copy. Items can only be added, removed, renamed or
//! reordered while `OPEN`.
//!
//! Each `submit` increments `version` and appends an [`ArrangementSnapshot`]
//! to `history`. Review fills in the outcome of that snapshot. Students are
//! shown [`ContentArrangement::published`], the most recent approved
//! snapshot, never the working copy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lms_core::{validate_name, ContentItemId, CourseId, Timestamp, UserId, ValidationError};

/// Upper bound on items in a single arrangement.
pub const MAX_ITEMS: usize = 500;

const MAX_TITLE_CHARS: usize = 200;
const MAX_URL_CHARS: usize = 2048;
const MAX_REMARKS_CHARS: usize = 2000;

// ─── Arrangement State ───────────────────────────────────────────────

/// Workflow state of a content arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArrangementState {
    /// Being edited by the course coordinator.
    Open,
    /// Awaiting HOD review. Frozen.
    Submitted,
    /// Accepted by the HOD. The submitted snapshot is now published.
    Approved,
    /// Sent back by the HOD with remarks.
    Rejected,
}

impl ArrangementState {
    /// Canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parse a canonical name, case-insensitively.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "SUBMITTED" => Some(Self::Submitted),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// States reachable in one step from this one.
    pub fn valid_transitions(&self) -> &'static [ArrangementState] {
        match self {
            Self::Open => &[Self::Submitted],
            Self::Submitted => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::Open],
            Self::Rejected => &[Self::Open],
        }
    }

    /// Whether items may be edited in this state.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for ArrangementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Items ───────────────────────────────────────────────────────────

/// Kind of content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentKind {
    Video,
    Document,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "VIDEO",
            Self::Document => "DOCUMENT",
        }
    }
}

/// A single video or document in an arrangement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentItemId,
    pub kind: ContentKind,
    pub title: String,
    pub url: String,
    /// Running time in seconds. Videos only.
    pub duration_secs: Option<u32>,
}

// ─── History ─────────────────────────────────────────────────────────

/// Review outcome of a submitted version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewOutcome {
    Pending,
    Approved,
    Rejected,
}

impl ReviewOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// The item list exactly as it was submitted for a given version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrangementSnapshot {
    pub version: u32,
    pub items: Vec<ContentItem>,
    pub submitted_at: Timestamp,
    pub submitted_by: Option<UserId>,
    pub outcome: ReviewOutcome,
    pub reviewed_at: Option<Timestamp>,
    pub reviewed_by: Option<UserId>,
    pub remarks: Option<String>,
}

/// Record of a workflow transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrangementTransitionRecord {
    pub from_state: ArrangementState,
    pub to_state: ArrangementState,
    pub at: Timestamp,
    pub actor: Option<UserId>,
    pub remarks: Option<String>,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by arrangement edits and transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArrangementError {
    /// Transition not permitted from the current state.
    #[error("invalid arrangement transition: {from} -> {to}")]
    InvalidTransition {
        from: ArrangementState,
        to: ArrangementState,
    },

    /// Edit attempted outside the OPEN state.
    #[error("arrangement is {state}; items can only be changed while OPEN")]
    NotEditable { state: ArrangementState },

    /// Submit attempted with no items.
    #[error("cannot submit an empty arrangement")]
    EmptySubmission,

    /// No item with this id in the working copy.
    #[error("content item {0} not found")]
    ItemNotFound(ContentItemId),

    /// Reorder index outside the item list.
    #[error("index {index} out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    /// Full reorder was not a permutation of the current items.
    #[error("order mismatch: {0}")]
    OrderMismatch(String),

    /// Arrangement already holds `MAX_ITEMS`.
    #[error("arrangement is full ({max} items)")]
    TooManyItems { max: usize },

    /// Rejection without remarks.
    #[error("remarks are required when rejecting an arrangement")]
    RemarksRequired,

    /// Item field failed validation.
    #[error("invalid item: {0}")]
    InvalidItem(#[from] ValidationError),

    /// Duration given for a non-video item.
    #[error("only videos carry a duration")]
    DurationOnDocument,
}

// ─── Content Arrangement ─────────────────────────────────────────────

/// The per-course content arrangement with its workflow state and history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentArrangement {
    pub course_id: CourseId,
    pub state: ArrangementState,
    /// Number of times the arrangement has been submitted. 0 until first submit.
    pub version: u32,
    /// Working copy, in display order.
    pub items: Vec<ContentItem>,
    /// One snapshot per submitted version, oldest first.
    pub history: Vec<ArrangementSnapshot>,
    pub transitions: Vec<ArrangementTransitionRecord>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ContentArrangement {
    /// Create the open, empty arrangement for a course.
    pub fn new(course_id: CourseId) -> Self {
        let now = Timestamp::now();
        Self {
            course_id,
            state: ArrangementState::Open,
            version: 0,
            items: Vec::new(),
            history: Vec::new(),
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    // ── Editing ──────────────────────────────────────────────────────

    /// Append an item to the end of the working copy.
    pub fn add_item(
        &mut self,
        kind: ContentKind,
        title: &str,
        url: &str,
        duration_secs: Option<u32>,
    ) -> Result<ContentItemId, ArrangementError> {
        self.require_editable()?;
        if self.items.len() >= MAX_ITEMS {
            return Err(ArrangementError::TooManyItems { max: MAX_ITEMS });
        }
        if kind == ContentKind::Document && duration_secs.is_some() {
            return Err(ArrangementError::DurationOnDocument);
        }
        let title = validate_name("title", title, MAX_TITLE_CHARS)?;
        let url = validate_name("url", url, MAX_URL_CHARS)?;

        let id = ContentItemId::new();
        self.items.push(ContentItem {
            id,
            kind,
            title,
            url,
            duration_secs,
        });
        self.touch();
        Ok(id)
    }

    /// Change an item's title.
    pub fn rename_item(&mut self, id: ContentItemId, title: &str) -> Result<(), ArrangementError> {
        self.require_editable()?;
        let title = validate_name("title", title, MAX_TITLE_CHARS)?;
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(ArrangementError::ItemNotFound(id))?;
        item.title = title;
        self.touch();
        Ok(())
    }

    /// Remove an item from the working copy.
    pub fn remove_item(&mut self, id: ContentItemId) -> Result<ContentItem, ArrangementError> {
        self.require_editable()?;
        let pos = self
            .position(id)
            .ok_or(ArrangementError::ItemNotFound(id))?;
        let removed = self.items.remove(pos);
        self.touch();
        Ok(removed)
    }

    /// Drag-and-drop move: take the item at `from` and insert it at `to`.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), ArrangementError> {
        self.require_editable()?;
        let len = self.items.len();
        for index in [from, to] {
            if index >= len {
                return Err(ArrangementError::IndexOutOfRange { index, len });
            }
        }
        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
            self.touch();
        }
        Ok(())
    }

    /// Replace the order wholesale. `order` must be a permutation of the
    /// current item ids.
    pub fn set_order(&mut self, order: &[ContentItemId]) -> Result<(), ArrangementError> {
        self.require_editable()?;
        if order.len() != self.items.len() {
            return Err(ArrangementError::OrderMismatch(format!(
                "expected {} ids, got {}",
                self.items.len(),
                order.len()
            )));
        }

        let mut positions = Vec::with_capacity(order.len());
        let mut seen = vec![false; self.items.len()];
        for id in order {
            match self.position(*id) {
                Some(pos) if !seen[pos] => {
                    seen[pos] = true;
                    positions.push(pos);
                }
                _ => {
                    return Err(ArrangementError::OrderMismatch(format!(
                        "{id} is unknown or repeated"
                    )))
                }
            }
        }

        self.items = positions.into_iter().map(|p| self.items[p].clone()).collect();
        self.touch();
        Ok(())
    }

    // ── Workflow ─────────────────────────────────────────────────────

    /// Submit for review (OPEN → SUBMITTED). Returns the new version number.
    pub fn submit(&mut self, actor: Option<UserId>) -> Result<u32, ArrangementError> {
        self.require_transition(ArrangementState::Submitted)?;
        if self.items.is_empty() {
            return Err(ArrangementError::EmptySubmission);
        }
        self.version += 1;
        let now = Timestamp::now();
        self.history.push(ArrangementSnapshot {
            version: self.version,
            items: self.items.clone(),
            submitted_at: now,
            submitted_by: actor,
            outcome: ReviewOutcome::Pending,
            reviewed_at: None,
            reviewed_by: None,
            remarks: None,
        });
        self.do_transition(ArrangementState::Submitted, actor, None);
        Ok(self.version)
    }

    /// Approve the submitted version (SUBMITTED → APPROVED).
    pub fn approve(
        &mut self,
        actor: Option<UserId>,
        remarks: Option<&str>,
    ) -> Result<(), ArrangementError> {
        self.require_transition(ArrangementState::Approved)?;
        let remarks = match remarks.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => Some(validate_name("remarks", r, MAX_REMARKS_CHARS)?),
            None => None,
        };
        self.close_review(ReviewOutcome::Approved, actor, remarks.clone());
        self.do_transition(ArrangementState::Approved, actor, remarks);
        Ok(())
    }

    /// Reject the submitted version (SUBMITTED → REJECTED). Remarks are required.
    pub fn reject(&mut self, actor: Option<UserId>, remarks: &str) -> Result<(), ArrangementError> {
        self.require_transition(ArrangementState::Rejected)?;
        if remarks.trim().is_empty() {
            return Err(ArrangementError::RemarksRequired);
        }
        let remarks = validate_name("remarks", remarks, MAX_REMARKS_CHARS)?;
        self.close_review(ReviewOutcome::Rejected, actor, Some(remarks.clone()));
        self.do_transition(ArrangementState::Rejected, actor, Some(remarks));
        Ok(())
    }

    /// Reopen for editing (REJECTED → OPEN, or APPROVED → OPEN for a new
    /// revision). The working copy keeps the last submitted order.
    pub fn reopen(&mut self, actor: Option<UserId>) -> Result<(), ArrangementError> {
        self.require_transition(ArrangementState::Open)?;
        self.do_transition(ArrangementState::Open, actor, None);
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// The most recent approved snapshot: what students see.
    pub fn published(&self) -> Option<&ArrangementSnapshot> {
        self.history
            .iter()
            .rev()
            .find(|s| s.outcome == ReviewOutcome::Approved)
    }

    /// The snapshot of the current version, if any version was submitted.
    pub fn latest_snapshot(&self) -> Option<&ArrangementSnapshot> {
        self.history.last()
    }

    /// Snapshot for a given version number.
    pub fn snapshot(&self, version: u32) -> Option<&ArrangementSnapshot> {
        self.history.iter().find(|s| s.version == version)
    }

    /// Whether the arrangement is waiting for HOD review.
    pub fn is_pending_review(&self) -> bool {
        self.state == ArrangementState::Submitted
    }

    /// Total running time of the working copy's videos, in seconds.
    pub fn total_video_secs(&self) -> u64 {
        self.items
            .iter()
            .filter_map(|i| i.duration_secs)
            .map(u64::from)
            .sum()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn position(&self, id: ContentItemId) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    fn require_editable(&self) -> Result<(), ArrangementError> {
        if self.state.is_editable() {
            Ok(())
        } else {
            Err(ArrangementError::NotEditable { state: self.state })
        }
    }

    fn require_transition(&self, to: ArrangementState) -> Result<(), ArrangementError> {
        if self.state.valid_transitions().contains(&to) {
            Ok(())
        } else {
            Err(ArrangementError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }

    fn close_review(
        &mut self,
        outcome: ReviewOutcome,
        actor: Option<UserId>,
        remarks: Option<String>,
    ) {
        if let Some(snapshot) = self.history.last_mut() {
            snapshot.outcome = outcome;
            snapshot.reviewed_at = Some(Timestamp::now());
            snapshot.reviewed_by = actor;
            snapshot.remarks = remarks;
        }
    }

    fn do_transition(
        &mut self,
        to: ArrangementState,
        actor: Option<UserId>,
        remarks: Option<String>,
    ) {
        let now = Timestamp::now();
        self.transitions.push(ArrangementTransitionRecord {
            from_state: self.state,
            to_state: to,
            at: now,
            actor,
            remarks,
        });
        self.state = to;
        self.updated_at = now;
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arrangement_with(n: usize) -> ContentArrangement {
        let mut a = ContentArrangement::new(CourseId::new());
        for i in 0..n {
            let kind = if i % 2 == 0 {
                ContentKind::Video
            } else {
                ContentKind::Document
            };
            let duration = (kind == ContentKind::Video).then_some(600);
            a.add_item(kind, &format!("Item {i}"), &format!("https://cdn/{i}"), duration)
                .unwrap();
        }
        a
    }

    fn titles(a: &ContentArrangement) -> Vec<String> {
        a.items.iter().map(|i| i.title.clone()).collect()
    }

    // ── Editing ──────────────────────────────────────────────────────

    #[test]
    fn new_arrangement_is_open_at_version_zero() {
        let a = ContentArrangement::new(CourseId::new());
        assert_eq!(a.state, ArrangementState::Open);
        assert_eq!(a.version, 0);
        assert!(a.items.is_empty());
        assert!(a.published().is_none());
    }

    #[test]
    fn add_item_validates_fields() {
        let mut a = ContentArrangement::new(CourseId::new());
        assert!(matches!(
            a.add_item(ContentKind::Video, "  ", "https://x", None),
            Err(ArrangementError::InvalidItem(_))
        ));
        assert_eq!(
            a.add_item(ContentKind::Document, "Notes", "https://x", Some(30)),
            Err(ArrangementError::DurationOnDocument)
        );
        let id = a
            .add_item(ContentKind::Document, "  Notes ", "https://x", None)
            .unwrap();
        assert_eq!(a.items[0].id, id);
        assert_eq!(a.items[0].title, "Notes");
    }

    #[test]
    fn move_item_forward_and_backward() {
        let mut a = arrangement_with(4);
        a.move_item(0, 2).unwrap();
        assert_eq!(titles(&a), ["Item 1", "Item 2", "Item 0", "Item 3"]);
        a.move_item(3, 0).unwrap();
        assert_eq!(titles(&a), ["Item 3", "Item 1", "Item 2", "Item 0"]);
    }

    #[test]
    fn move_item_out_of_range() {
        let mut a = arrangement_with(2);
        assert_eq!(
            a.move_item(0, 2),
            Err(ArrangementError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn set_order_applies_permutation() {
        let mut a = arrangement_with(3);
        let ids: Vec<_> = a.items.iter().rev().map(|i| i.id).collect();
        a.set_order(&ids).unwrap();
        assert_eq!(titles(&a), ["Item 2", "Item 1", "Item 0"]);
    }

    #[test]
    fn set_order_rejects_duplicates_and_keeps_items() {
        let mut a = arrangement_with(3);
        let before = titles(&a);
        let first = a.items[0].id;
        let err = a.set_order(&[first, first, first]).unwrap_err();
        assert!(matches!(err, ArrangementError::OrderMismatch(_)));
        assert_eq!(titles(&a), before);
    }

    #[test]
    fn set_order_rejects_wrong_length() {
        let mut a = arrangement_with(3);
        let first = a.items[0].id;
        assert!(matches!(
            a.set_order(&[first]),
            Err(ArrangementError::OrderMismatch(_))
        ));
    }

    #[test]
    fn remove_and_rename() {
        let mut a = arrangement_with(2);
        let id = a.items[1].id;
        a.rename_item(id, "Lab sheet").unwrap();
        assert_eq!(a.items[1].title, "Lab sheet");
        let removed = a.remove_item(id).unwrap();
        assert_eq!(removed.title, "Lab sheet");
        assert_eq!(a.items.len(), 1);
        assert_eq!(a.remove_item(id), Err(ArrangementError::ItemNotFound(id)));
    }

    // ── Workflow ─────────────────────────────────────────────────────

    #[test]
    fn empty_arrangement_cannot_be_submitted() {
        let mut a = ContentArrangement::new(CourseId::new());
        assert_eq!(a.submit(None), Err(ArrangementError::EmptySubmission));
        assert_eq!(a.version, 0);
        assert_eq!(a.state, ArrangementState::Open);
    }

    #[test]
    fn submit_freezes_and_snapshots() {
        let mut a = arrangement_with(2);
        let cc = UserId::new();
        assert_eq!(a.submit(Some(cc)).unwrap(), 1);
        assert_eq!(a.state, ArrangementState::Submitted);
        assert_eq!(a.history.len(), 1);
        assert_eq!(a.history[0].submitted_by, Some(cc));
        assert_eq!(a.history[0].outcome, ReviewOutcome::Pending);
        assert_eq!(
            a.move_item(0, 1),
            Err(ArrangementError::NotEditable {
                state: ArrangementState::Submitted
            })
        );
    }

    #[test]
    fn approve_publishes_snapshot() {
        let mut a = arrangement_with(2);
        a.submit(None).unwrap();
        let hod = UserId::new();
        a.approve(Some(hod), Some("Looks good")).unwrap();
        assert_eq!(a.state, ArrangementState::Approved);
        let published = a.published().unwrap();
        assert_eq!(published.version, 1);
        assert_eq!(published.reviewed_by, Some(hod));
        assert_eq!(published.remarks.as_deref(), Some("Looks good"));
    }

    #[test]
    fn reject_requires_remarks() {
        let mut a = arrangement_with(1);
        a.submit(None).unwrap();
        assert_eq!(a.reject(None, "  "), Err(ArrangementError::RemarksRequired));
        a.reject(None, "Move the intro video first").unwrap();
        assert_eq!(a.state, ArrangementState::Rejected);
        assert_eq!(a.history[0].outcome, ReviewOutcome::Rejected);
        assert!(a.published().is_none());
    }

    #[test]
    fn version_increments_on_each_submit_cycle() {
        let mut a = arrangement_with(2);
        a.submit(None).unwrap();
        a.reject(None, "reorder").unwrap();
        a.reopen(None).unwrap();
        a.move_item(1, 0).unwrap();
        assert_eq!(a.submit(None).unwrap(), 2);
        a.approve(None, None).unwrap();
        a.reopen(None).unwrap();
        assert_eq!(a.submit(None).unwrap(), 3);
        assert_eq!(a.history.len(), 3);
        assert_eq!(a.snapshot(2).unwrap().outcome, ReviewOutcome::Approved);
    }

    #[test]
    fn published_survives_new_revision() {
        let mut a = arrangement_with(2);
        a.submit(None).unwrap();
        a.approve(None, None).unwrap();
        let approved_titles: Vec<_> = a.items.iter().map(|i| i.title.clone()).collect();

        a.reopen(None).unwrap();
        a.add_item(ContentKind::Document, "Extra", "https://x", None)
            .unwrap();
        a.submit(None).unwrap();
        a.reject(None, "not yet").unwrap();

        let published = a.published().unwrap();
        assert_eq!(published.version, 1);
        let published_titles: Vec<_> = published.items.iter().map(|i| i.title.clone()).collect();
        assert_eq!(published_titles, approved_titles);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut a = arrangement_with(1);
        assert_eq!(
            a.approve(None, None),
            Err(ArrangementError::InvalidTransition {
                from: ArrangementState::Open,
                to: ArrangementState::Approved
            })
        );
        assert!(a.reopen(None).is_err());
        a.submit(None).unwrap();
        assert!(a.submit(None).is_err());
        assert!(a.reopen(None).is_err());
    }

    #[test]
    fn transition_log_records_every_step() {
        let mut a = arrangement_with(1);
        a.submit(None).unwrap();
        a.reject(None, "fix").unwrap();
        a.reopen(None).unwrap();
        let steps: Vec<_> = a
            .transitions
            .iter()
            .map(|t| (t.from_state, t.to_state))
            .collect();
        assert_eq!(
            steps,
            [
                (ArrangementState::Open, ArrangementState::Submitted),
                (ArrangementState::Submitted, ArrangementState::Rejected),
                (ArrangementState::Rejected, ArrangementState::Open),
            ]
        );
        assert_eq!(a.transitions[1].remarks.as_deref(), Some("fix"));
    }

    #[test]
    fn total_video_secs_ignores_documents() {
        let a = arrangement_with(3);
        assert_eq!(a.total_video_secs(), 1200);
    }

    #[test]
    fn state_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&ArrangementState::Submitted).unwrap(),
            "\"SUBMITTED\""
        );
        assert_eq!(ArrangementState::from_name("approved"), Some(ArrangementState::Approved));
        assert_eq!(ArrangementState::from_name("draft"), None);
    }

    proptest! {
        #[test]
        fn move_item_preserves_items(n in 1usize..20, from in 0usize..20, to in 0usize..20) {
            let mut a = arrangement_with(n);
            let mut before: Vec<_> = a.items.iter().map(|i| i.id).collect();
            let result = a.move_item(from, to);
            prop_assert_eq!(result.is_ok(), from < n && to < n);
            if result.is_ok() {
                prop_assert_eq!(a.items[to].id, before[from]);
            }
            let mut after: Vec<_> = a.items.iter().map(|i| i.id).collect();
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
        }
    }
}
