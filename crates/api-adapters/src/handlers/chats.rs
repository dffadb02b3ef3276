use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use domains::{Chat, ChatSummary, Message};
use uuid::Uuid;

use crate::dto::{MarkedReadResponse, TextRequest, UnreadResponse, UsernameRequest};
use crate::extract::AuthUser;
use crate::{ApiResult, AppState};

pub async fn list(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<Vec<ChatSummary>>> {
    Ok(Json(state.services.messaging.list_chats(&user).await?))
}

/// Returns the existing chat with that user, or starts one.
pub async fn open(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<UsernameRequest>,
) -> ApiResult<Json<Chat>> {
    Ok(Json(state.services.messaging.open_chat(&user, &req.username).await?))
}

pub async fn history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Message>>> {
    Ok(Json(state.services.messaging.history(&user, id).await?))
}

pub async fn send(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<TextRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let message = state.services.messaging.send(&user, id, &req.body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MarkedReadResponse>> {
    let marked = state.services.messaging.mark_read(&user, id).await?;
    Ok(Json(MarkedReadResponse { marked }))
}

pub async fn unread(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<UnreadResponse>> {
    let unread = state.services.messaging.unread_total(&user).await?;
    Ok(Json(UnreadResponse { unread }))
}
