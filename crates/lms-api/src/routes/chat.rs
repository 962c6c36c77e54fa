//! # Section Chat
//!
//! One conversation per section. Readable and writable by the section
//! teacher, its students, the course coordinator, and HODs and Deans.
//!
//! - `POST /v1/sections/:section_id/messages`: post a message
//! - `GET  /v1/sections/:section_id/messages?since=&limit=`: oldest first

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::access::{load_section, require_section_member};
use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, Validate};
use crate::state::{AppState, ChatMessageRecord};

const MAX_BODY_CHARS: usize = 2000;
const DEFAULT_PAGE: usize = 50;
const MAX_PAGE: usize = 200;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PostMessageRequest {
    pub body: String,
}

impl Validate for PostMessageRequest {
    fn validate(&self) -> Result<(), String> {
        let chars = self.body.trim().chars().count();
        if chars == 0 {
            return Err("body must not be empty".into());
        }
        if chars > MAX_BODY_CHARS {
            return Err(format!("body must be at most {MAX_BODY_CHARS} characters"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: Uuid,
    pub section_id: Uuid,
    pub author_id: Option<Uuid>,
    pub author_role: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<&ChatMessageRecord> for MessageResponse {
    fn from(m: &ChatMessageRecord) -> Self {
        Self {
            id: m.id,
            section_id: *m.section_id.as_uuid(),
            author_id: m.author_id.map(|u| *u.as_uuid()),
            author_role: m.author_role.as_str().to_string(),
            body: m.body.clone(),
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListMessagesQuery {
    /// Only messages posted strictly after this instant (RFC 3339).
    pub since: Option<DateTime<Utc>>,
    /// Default 50, at most 200.
    pub limit: Option<usize>,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/v1/sections/:section_id/messages",
        post(post_message).get(list_messages),
    )
}

/// POST /v1/sections/:section_id/messages: Post to the section conversation.
#[utoipa::path(
    post,
    path = "/v1/sections/{section_id}/messages",
    params(("section_id" = Uuid, Path, description = "Section UUID")),
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message posted", body = MessageResponse),
        (status = 403, description = "Not a member of the section", body = crate::error::ErrorBody),
        (status = 422, description = "Empty or oversized body", body = crate::error::ErrorBody),
    ),
    tag = "chat"
)]
pub async fn post_message(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(section_id): Path<Uuid>,
    body: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let section = load_section(&state, section_id)?;
    require_section_member(&state, &caller, &section)?;
    let req = extract_validated_json(body)?;

    let message = ChatMessageRecord {
        id: Uuid::new_v4(),
        section_id: section.id,
        author_id: caller.user_id,
        author_role: caller.role,
        body: req.body.trim().to_string(),
        created_at: Utc::now(),
    };
    let response = MessageResponse::from(&message);
    state
        .chats
        .write()
        .entry(section.id)
        .or_default()
        .push(message);

    tracing::debug!(section_id = %section.id, role = caller.role.as_str(), "chat message posted");
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /v1/sections/:section_id/messages: Read the conversation.
///
/// With `since`, returns the first `limit` messages after it (polling).
/// Without, returns the most recent `limit` messages. Oldest first either way.
#[utoipa::path(
    get,
    path = "/v1/sections/{section_id}/messages",
    params(("section_id" = Uuid, Path, description = "Section UUID"), ListMessagesQuery),
    responses(
        (status = 200, description = "Messages, oldest first", body = Vec<MessageResponse>),
        (status = 403, description = "Not a member of the section", body = crate::error::ErrorBody),
    ),
    tag = "chat"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(section_id): Path<Uuid>,
    query: Result<Query<ListMessagesQuery>, QueryRejection>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let section = load_section(&state, section_id)?;
    require_section_member(&state, &caller, &section)?;
    let query = extract_query(query)?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);

    let chats = state.chats.read();
    let messages = chats.get(&section.id).map(Vec::as_slice).unwrap_or_default();
    let page: Vec<MessageResponse> = match query.since {
        Some(since) => messages
            .iter()
            .filter(|m| m.created_at > since)
            .take(limit)
            .map(MessageResponse::from)
            .collect(),
        None => messages[messages.len().saturating_sub(limit)..]
            .iter()
            .map(MessageResponse::from)
            .collect(),
    };
    Ok(Json(page))
}
