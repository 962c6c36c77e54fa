//! # Notifications
//!
//! The caller's inbox. Notifications are created by the arrangement
//! workflow and course launches (see [`crate::notify`]).
//!
//! - `GET  /v1/notifications?unread=`: newest first
//! - `POST /v1/notifications/:notification_id/read`
//! - `POST /v1/notifications/read-all`

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_user, CallerIdentity};
use crate::error::AppError;
use crate::extractors::extract_query;
use crate::state::{AppState, NotificationRecord};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    pub id: Uuid,
    /// `arrangement_submitted`, `arrangement_approved`, `arrangement_rejected`
    /// or `course_launched`.
    pub kind: String,
    pub course_id: Uuid,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&NotificationRecord> for NotificationResponse {
    fn from(n: &NotificationRecord) -> Self {
        Self {
            id: n.id,
            kind: n.kind.as_str().to_string(),
            course_id: *n.course_id.as_uuid(),
            message: n.message.clone(),
            read: n.read,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListNotificationsQuery {
    /// When `true`, only unread notifications.
    pub unread: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadAllResponse {
    pub marked: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/notifications", get(list_notifications))
        .route("/v1/notifications/read-all", post(mark_all_read))
        .route("/v1/notifications/:notification_id/read", post(mark_read))
}

/// GET /v1/notifications: The caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/v1/notifications",
    params(ListNotificationsQuery),
    responses(
        (status = 200, description = "Notifications", body = Vec<NotificationResponse>),
        (
            status = 403,
            description = "Service tokens have no inbox",
            body = crate::error::ErrorBody,
        ),
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<ListNotificationsQuery>, QueryRejection>,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    let user = require_user(&caller)?;
    let only_unread = extract_query(query)?.unread.unwrap_or(false);
    let mut inbox = state
        .notifications
        .filter(|n| n.recipient_id == user && !(only_unread && n.read));
    inbox.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(Json(inbox.iter().map(NotificationResponse::from).collect()))
}

/// POST /v1/notifications/:notification_id/read: Mark one as read.
#[utoipa::path(
    post,
    path = "/v1/notifications/{notification_id}/read",
    params(("notification_id" = Uuid, Path, description = "Notification UUID")),
    responses(
        (status = 200, description = "Marked read", body = NotificationResponse),
        (status = 404, description = "Not in the caller's inbox", body = crate::error::ErrorBody),
    ),
    tag = "notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<NotificationResponse>, AppError> {
    let user = require_user(&caller)?;
    let not_found = || AppError::NotFound(format!("notification {notification_id} not found"));
    let updated = state
        .notifications
        .try_update(&notification_id, |n| {
            if n.recipient_id != user {
                return Err(not_found());
            }
            n.read = true;
            Ok(n.clone())
        })
        .ok_or_else(not_found)??;
    Ok(Json(NotificationResponse::from(&updated)))
}

/// POST /v1/notifications/read-all: Mark the whole inbox as read.
#[utoipa::path(
    post,
    path = "/v1/notifications/read-all",
    responses(
        (status = 200, description = "Number of notifications marked", body = ReadAllResponse),
    ),
    tag = "notifications"
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<ReadAllResponse>, AppError> {
    let user = require_user(&caller)?;
    let unread = state
        .notifications
        .filter(|n| n.recipient_id == user && !n.read);
    let mut marked = 0;
    for n in unread {
        if state.notifications.update(&n.id, |n| n.read = true).is_some() {
            marked += 1;
        }
    }
    Ok(Json(ReadAllResponse { marked }))
}
