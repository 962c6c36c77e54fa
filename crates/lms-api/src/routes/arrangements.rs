//! # Content Arrangement Workflow
//!
//! Editing is done by the course coordinator on the working copy while the
//! arrangement is `OPEN`. Submitting freezes a numbered snapshot that the
//! department HOD approves or rejects. Students only ever see the latest
//! approved snapshot of a launched course.
//!
//! - `GET    /v1/courses/:course_id/arrangement`
//! - `POST   /v1/courses/:course_id/arrangement/items`
//! - `PATCH  /v1/courses/:course_id/arrangement/items/:item_id`
//! - `DELETE /v1/courses/:course_id/arrangement/items/:item_id`
//! - `POST   /v1/courses/:course_id/arrangement/move`
//! - `PUT    /v1/courses/:course_id/arrangement/order`
//! - `POST   /v1/courses/:course_id/arrangement/{submit,approve,reject,reopen}`
//! - `GET    /v1/courses/:course_id/arrangement/history`
//! - `GET    /v1/courses/:course_id/content`

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use lms_core::{ContentItemId, Role};
use lms_state::{
    ArrangementError, ArrangementSnapshot, ArrangementTransitionRecord, ContentArrangement,
    ContentItem, ContentKind, Course,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{persist_arrangement, record_audit};
use crate::access::{load_course, require_coordinator, require_department_authority};
use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::notify::{department_hods, notify};
use crate::state::{AppState, NotificationKind};

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AddItemRequest {
    /// `video` or `document`.
    pub kind: String,
    pub title: String,
    pub url: String,
    /// Running time in seconds, videos only.
    #[serde(default)]
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RenameItemRequest {
    pub title: String,
}

/// Drag-and-drop: move the item at index `from` to index `to`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct MoveItemRequest {
    pub from: usize,
    pub to: usize,
}

/// Full reorder. Must list every current item id exactly once.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SetOrderRequest {
    pub item_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ApproveRequest {
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RejectRequest {
    pub remarks: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContentItemResponse {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub url: String,
    pub duration_secs: Option<u32>,
}

impl From<&ContentItem> for ContentItemResponse {
    fn from(item: &ContentItem) -> Self {
        Self {
            id: *item.id.as_uuid(),
            kind: item.kind.as_str().to_string(),
            title: item.title.clone(),
            url: item.url.clone(),
            duration_secs: item.duration_secs,
        }
    }
}

/// The coordinator's working copy.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ArrangementResponse {
    pub course_id: Uuid,
    pub state: String,
    pub version: u32,
    pub items: Vec<ContentItemResponse>,
    pub total_video_secs: u64,
    pub published_version: Option<u32>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ContentArrangement> for ArrangementResponse {
    fn from(a: &ContentArrangement) -> Self {
        Self {
            course_id: *a.course_id.as_uuid(),
            state: a.state.as_str().to_string(),
            version: a.version,
            items: a.items.iter().map(ContentItemResponse::from).collect(),
            total_video_secs: a.total_video_secs(),
            published_version: a.published().map(|s| s.version),
            updated_at: *a.updated_at.as_datetime(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SnapshotResponse {
    pub version: u32,
    pub items: Vec<ContentItemResponse>,
    pub submitted_at: DateTime<Utc>,
    pub submitted_by: Option<Uuid>,
    /// `PENDING`, `APPROVED` or `REJECTED`.
    pub outcome: String,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub remarks: Option<String>,
}

impl From<&ArrangementSnapshot> for SnapshotResponse {
    fn from(s: &ArrangementSnapshot) -> Self {
        Self {
            version: s.version,
            items: s.items.iter().map(ContentItemResponse::from).collect(),
            submitted_at: *s.submitted_at.as_datetime(),
            submitted_by: s.submitted_by.map(|u| *u.as_uuid()),
            outcome: s.outcome.as_str().to_string(),
            reviewed_at: s.reviewed_at.map(|t| *t.as_datetime()),
            reviewed_by: s.reviewed_by.map(|u| *u.as_uuid()),
            remarks: s.remarks.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionResponse {
    pub from_state: String,
    pub to_state: String,
    pub at: DateTime<Utc>,
    pub actor: Option<Uuid>,
    pub remarks: Option<String>,
}

impl From<&ArrangementTransitionRecord> for TransitionResponse {
    fn from(t: &ArrangementTransitionRecord) -> Self {
        Self {
            from_state: t.from_state.as_str().to_string(),
            to_state: t.to_state.as_str().to_string(),
            at: *t.at.as_datetime(),
            actor: t.actor.map(|u| *u.as_uuid()),
            remarks: t.remarks.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub course_id: Uuid,
    pub current_state: String,
    /// Submitted versions, oldest first.
    pub versions: Vec<SnapshotResponse>,
    pub transitions: Vec<TransitionResponse>,
}

/// What an enrolled student sees.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CourseContentResponse {
    pub course_id: Uuid,
    pub code: String,
    pub title: String,
    pub version: u32,
    pub items: Vec<ContentItemResponse>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/courses/:course_id/arrangement", get(get_arrangement))
        .route("/v1/courses/:course_id/arrangement/items", post(add_item))
        .route(
            "/v1/courses/:course_id/arrangement/items/:item_id",
            patch(rename_item).delete(remove_item),
        )
        .route("/v1/courses/:course_id/arrangement/move", post(move_item))
        .route("/v1/courses/:course_id/arrangement/order", put(set_order))
        .route("/v1/courses/:course_id/arrangement/submit", post(submit))
        .route("/v1/courses/:course_id/arrangement/approve", post(approve))
        .route("/v1/courses/:course_id/arrangement/reject", post(reject))
        .route("/v1/courses/:course_id/arrangement/reopen", post(reopen))
        .route("/v1/courses/:course_id/arrangement/history", get(history))
        .route("/v1/courses/:course_id/content", get(course_content))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /v1/courses/:course_id/arrangement: The working copy.
#[utoipa::path(
    get,
    path = "/v1/courses/{course_id}/arrangement",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    responses(
        (status = 200, description = "Working copy", body = ArrangementResponse),
        (status = 404, description = "Course not found", body = crate::error::ErrorBody),
    ),
    tag = "arrangements"
)]
pub async fn get_arrangement(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ArrangementResponse>, AppError> {
    require_role(&caller, Role::Teacher)?;
    let arrangement = load_arrangement(&state, course_id)?;
    Ok(Json(ArrangementResponse::from(&arrangement)))
}

/// GET /v1/courses/:course_id/arrangement/history: Versions and transitions.
#[utoipa::path(
    get,
    path = "/v1/courses/{course_id}/arrangement/history",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    responses((status = 200, description = "Version history", body = HistoryResponse)),
    tag = "arrangements"
)]
pub async fn history(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, AppError> {
    require_role(&caller, Role::Teacher)?;
    let a = load_arrangement(&state, course_id)?;
    Ok(Json(HistoryResponse {
        course_id,
        current_state: a.state.as_str().to_string(),
        versions: a.history.iter().map(SnapshotResponse::from).collect(),
        transitions: a.transitions.iter().map(TransitionResponse::from).collect(),
    }))
}

/// GET /v1/courses/:course_id/content: Published content of a launched course.
///
/// Students must be enrolled in one of the course's sections. A course that
/// is not launched reads as not found.
#[utoipa::path(
    get,
    path = "/v1/courses/{course_id}/content",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    responses(
        (status = 200, description = "Published content", body = CourseContentResponse),
        (status = 403, description = "Student not enrolled", body = crate::error::ErrorBody),
        (status = 404, description = "Course not launched", body = crate::error::ErrorBody),
    ),
    tag = "arrangements"
)]
pub async fn course_content(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseContentResponse>, AppError> {
    let course = load_course(&state, course_id)?;
    let not_found = || AppError::NotFound(format!("course {course_id} has no published content"));
    if !course.is_launched() {
        return Err(not_found());
    }
    if !caller.has_role(Role::Teacher) {
        let user = crate::auth::require_user(&caller)?;
        let enrolled = state
            .sections_of(course.id)
            .iter()
            .any(|s| s.student_ids.contains(&user));
        if !enrolled {
            return Err(AppError::Forbidden(format!(
                "not enrolled in any section of {}",
                course.code
            )));
        }
    }

    let arrangement = load_arrangement(&state, course_id)?;
    let published = arrangement.published().ok_or_else(not_found)?;
    Ok(Json(CourseContentResponse {
        course_id,
        code: course.code,
        title: course.title,
        version: published.version,
        items: published.items.iter().map(ContentItemResponse::from).collect(),
    }))
}

// ---------------------------------------------------------------------------
// Editing (coordinator, OPEN only)
// ---------------------------------------------------------------------------

/// POST /v1/courses/:course_id/arrangement/items: Append an item.
#[utoipa::path(
    post,
    path = "/v1/courses/{course_id}/arrangement/items",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    request_body = AddItemRequest,
    responses(
        (status = 201, description = "Item added", body = ArrangementResponse),
        (status = 409, description = "Arrangement not open", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid item", body = crate::error::ErrorBody),
    ),
    tag = "arrangements"
)]
pub async fn add_item(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ArrangementResponse>), AppError> {
    let req = extract_json(body)?;
    let kind = parse_kind(&req.kind)?;
    let (_, arrangement) = edit(&state, &caller, course_id, |a| {
        a.add_item(kind, &req.title, &req.url, req.duration_secs)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(ArrangementResponse::from(&arrangement))))
}

/// PATCH /v1/courses/:course_id/arrangement/items/:item_id: Rename an item.
#[utoipa::path(
    patch,
    path = "/v1/courses/{course_id}/arrangement/items/{item_id}",
    params(
        ("course_id" = Uuid, Path, description = "Course UUID"),
        ("item_id" = Uuid, Path, description = "Content item UUID"),
    ),
    request_body = RenameItemRequest,
    responses(
        (status = 200, description = "Item renamed", body = ArrangementResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorBody),
    ),
    tag = "arrangements"
)]
pub async fn rename_item(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((course_id, item_id)): Path<(Uuid, Uuid)>,
    body: Result<Json<RenameItemRequest>, JsonRejection>,
) -> Result<Json<ArrangementResponse>, AppError> {
    let req = extract_json(body)?;
    let item_id = ContentItemId::from_uuid(item_id);
    let (_, arrangement) =
        edit(&state, &caller, course_id, |a| a.rename_item(item_id, &req.title)).await?;
    Ok(Json(ArrangementResponse::from(&arrangement)))
}

/// DELETE /v1/courses/:course_id/arrangement/items/:item_id: Remove an item.
#[utoipa::path(
    delete,
    path = "/v1/courses/{course_id}/arrangement/items/{item_id}",
    params(
        ("course_id" = Uuid, Path, description = "Course UUID"),
        ("item_id" = Uuid, Path, description = "Content item UUID"),
    ),
    responses(
        (status = 200, description = "Item removed", body = ArrangementResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorBody),
    ),
    tag = "arrangements"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((course_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ArrangementResponse>, AppError> {
    let item_id = ContentItemId::from_uuid(item_id);
    let (_, arrangement) = edit(&state, &caller, course_id, |a| a.remove_item(item_id)).await?;
    Ok(Json(ArrangementResponse::from(&arrangement)))
}

/// POST /v1/courses/:course_id/arrangement/move: Drag-and-drop move.
#[utoipa::path(
    post,
    path = "/v1/courses/{course_id}/arrangement/move",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    request_body = MoveItemRequest,
    responses(
        (status = 200, description = "Item moved", body = ArrangementResponse),
        (status = 422, description = "Index out of range", body = crate::error::ErrorBody),
    ),
    tag = "arrangements"
)]
pub async fn move_item(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
    body: Result<Json<MoveItemRequest>, JsonRejection>,
) -> Result<Json<ArrangementResponse>, AppError> {
    let req = extract_json(body)?;
    let (_, arrangement) =
        edit(&state, &caller, course_id, |a| a.move_item(req.from, req.to)).await?;
    Ok(Json(ArrangementResponse::from(&arrangement)))
}

/// PUT /v1/courses/:course_id/arrangement/order: Replace the order.
#[utoipa::path(
    put,
    path = "/v1/courses/{course_id}/arrangement/order",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    request_body = SetOrderRequest,
    responses(
        (status = 200, description = "Order replaced", body = ArrangementResponse),
        (
            status = 422,
            description = "Not a permutation of the current items",
            body = crate::error::ErrorBody,
        ),
    ),
    tag = "arrangements"
)]
pub async fn set_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
    body: Result<Json<SetOrderRequest>, JsonRejection>,
) -> Result<Json<ArrangementResponse>, AppError> {
    let req = extract_json(body)?;
    let order: Vec<ContentItemId> = req
        .item_ids
        .into_iter()
        .map(ContentItemId::from_uuid)
        .collect();
    let (_, arrangement) = edit(&state, &caller, course_id, |a| a.set_order(&order)).await?;
    Ok(Json(ArrangementResponse::from(&arrangement)))
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// POST /v1/courses/:course_id/arrangement/submit: Send for HOD review.
#[utoipa::path(
    post,
    path = "/v1/courses/{course_id}/arrangement/submit",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    responses(
        (status = 200, description = "Submitted; version incremented", body = ArrangementResponse),
        (status = 409, description = "Not open, or empty", body = crate::error::ErrorBody),
    ),
    tag = "arrangements"
)]
pub async fn submit(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ArrangementResponse>, AppError> {
    let (version, arrangement) =
        edit(&state, &caller, course_id, |a| a.submit(caller.user_id)).await?;
    let course = load_course(&state, course_id)?;
    record_audit(
        &state,
        &caller,
        "arrangement",
        course_id,
        "submit",
        serde_json::json!({ "version": version, "items": arrangement.items.len() }),
    )
    .await;
    notify(
        &state,
        department_hods(&state, course.department_id),
        NotificationKind::ArrangementSubmitted,
        &course,
        &format!("{} version {version} is waiting for review", course.code),
    );
    Ok(Json(ArrangementResponse::from(&arrangement)))
}

/// POST /v1/courses/:course_id/arrangement/approve: Approve the submitted version.
#[utoipa::path(
    post,
    path = "/v1/courses/{course_id}/arrangement/approve",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    request_body(content = ApproveRequest, description = "Optional remarks"),
    responses(
        (status = 200, description = "Approved", body = ArrangementResponse),
        (status = 409, description = "Nothing submitted", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed body", body = crate::error::ErrorBody),
    ),
    tag = "arrangements"
)]
pub async fn approve(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ArrangementResponse>, AppError> {
    let remarks = approve_remarks(&body)?;
    let (course, arrangement) = review(&state, &caller, course_id, |a| {
        a.approve(caller.user_id, remarks.as_deref())
    })?;
    persist_arrangement(&state, &arrangement).await?;
    record_audit(
        &state,
        &caller,
        "arrangement",
        course_id,
        "approve",
        serde_json::json!({ "version": arrangement.version }),
    )
    .await;
    notify(
        &state,
        course.coordinator_id,
        NotificationKind::ArrangementApproved,
        &course,
        &format!("{} version {} was approved", course.code, arrangement.version),
    );
    Ok(Json(ArrangementResponse::from(&arrangement)))
}

/// An empty body approves without remarks. Anything else must parse as
/// [`ApproveRequest`].
fn approve_remarks(body: &[u8]) -> Result<Option<String>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    extract_json(Json::<ApproveRequest>::from_bytes(body)).map(|request| request.remarks)
}

/// POST /v1/courses/:course_id/arrangement/reject: Send back with remarks.
#[utoipa::path(
    post,
    path = "/v1/courses/{course_id}/arrangement/reject",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Rejected", body = ArrangementResponse),
        (status = 409, description = "Nothing submitted", body = crate::error::ErrorBody),
        (status = 422, description = "Remarks missing", body = crate::error::ErrorBody),
    ),
    tag = "arrangements"
)]
pub async fn reject(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
    body: Result<Json<RejectRequest>, JsonRejection>,
) -> Result<Json<ArrangementResponse>, AppError> {
    let req = extract_json(body)?;
    let (course, arrangement) = review(&state, &caller, course_id, |a| {
        a.reject(caller.user_id, &req.remarks)
    })?;
    persist_arrangement(&state, &arrangement).await?;
    record_audit(
        &state,
        &caller,
        "arrangement",
        course_id,
        "reject",
        serde_json::json!({ "version": arrangement.version, "remarks": req.remarks.trim() }),
    )
    .await;
    notify(
        &state,
        course.coordinator_id,
        NotificationKind::ArrangementRejected,
        &course,
        &format!(
            "{} version {} was rejected: {}",
            course.code,
            arrangement.version,
            req.remarks.trim()
        ),
    );
    Ok(Json(ArrangementResponse::from(&arrangement)))
}

/// POST /v1/courses/:course_id/arrangement/reopen: Reopen for editing.
#[utoipa::path(
    post,
    path = "/v1/courses/{course_id}/arrangement/reopen",
    params(("course_id" = Uuid, Path, description = "Course UUID")),
    responses(
        (status = 200, description = "Open for editing", body = ArrangementResponse),
        (status = 409, description = "Not approved or rejected", body = crate::error::ErrorBody),
    ),
    tag = "arrangements"
)]
pub async fn reopen(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ArrangementResponse>, AppError> {
    let (_, arrangement) = edit(&state, &caller, course_id, |a| a.reopen(caller.user_id)).await?;
    record_audit(
        &state,
        &caller,
        "arrangement",
        course_id,
        "reopen",
        serde_json::json!({ "version": arrangement.version }),
    )
    .await;
    Ok(Json(ArrangementResponse::from(&arrangement)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_arrangement(state: &AppState, course_id: Uuid) -> Result<ContentArrangement, AppError> {
    load_course(state, course_id)?;
    state
        .arrangements
        .get(&course_id)
        .ok_or_else(|| AppError::Internal(format!("course {course_id} has no arrangement")))
}

fn writable_course(state: &AppState, course_id: Uuid) -> Result<Course, AppError> {
    let course = load_course(state, course_id)?;
    if course.state.is_terminal() {
        return Err(AppError::Conflict(format!("course {} is archived", course.code)));
    }
    Ok(course)
}

/// Apply a coordinator action to the arrangement under one write lock and
/// persist the result.
async fn edit<R>(
    state: &AppState,
    caller: &CallerIdentity,
    course_id: Uuid,
    apply: impl FnOnce(&mut ContentArrangement) -> Result<R, ArrangementError>,
) -> Result<(R, ContentArrangement), AppError> {
    let course = writable_course(state, course_id)?;
    require_coordinator(state, caller, &course)?;

    let (result, arrangement) = state
        .arrangements
        .try_update(&course_id, |a| {
            let result = apply(a)?;
            Ok::<_, AppError>((result, a.clone()))
        })
        .ok_or_else(|| AppError::Internal(format!("course {course_id} has no arrangement")))??;

    persist_arrangement(state, &arrangement).await?;
    tracing::debug!(
        course_id = %course.id,
        state = arrangement.state.as_str(),
        items = arrangement.items.len(),
        "arrangement updated"
    );
    Ok((result, arrangement))
}

/// Apply an HOD review decision. The caller persists.
fn review(
    state: &AppState,
    caller: &CallerIdentity,
    course_id: Uuid,
    apply: impl FnOnce(&mut ContentArrangement) -> Result<(), ArrangementError>,
) -> Result<(Course, ContentArrangement), AppError> {
    let course = writable_course(state, course_id)?;
    require_department_authority(state, caller, course.department_id)?;

    let arrangement = state
        .arrangements
        .try_update(&course_id, |a| {
            apply(a)?;
            Ok::<_, AppError>(a.clone())
        })
        .ok_or_else(|| AppError::Internal(format!("course {course_id} has no arrangement")))??;
    Ok((course, arrangement))
}

fn parse_kind(raw: &str) -> Result<ContentKind, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "video" => Ok(ContentKind::Video),
        "document" => Ok(ContentKind::Document),
        other => Err(AppError::Validation(format!(
            "unknown content kind '{other}', expected video or document"
        ))),
    }
}
