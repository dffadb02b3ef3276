use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use domains::{Answer, AnswerView, QuestionView, VoteTarget};
use services::{QuestionQuery, VoteResult};
use uuid::Uuid;

use crate::dto::{CorrectResponse, QuestionRequest, SensitiveRequest, SensitiveResponse, TextRequest, VoteRequest};
use crate::extract::AuthUser;
use crate::{ApiResult, AppState};

pub async fn search(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<QuestionQuery>,
) -> ApiResult<Json<Vec<QuestionView>>> {
    Ok(Json(state.services.questions.search(&user, &query).await?))
}

pub async fn ask(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<QuestionRequest>,
) -> ApiResult<(StatusCode, Json<QuestionView>)> {
    let view = state.services.questions.ask(&user, &req.title, &req.body).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<QuestionView>> {
    Ok(Json(state.services.questions.get(&user, id).await?))
}

pub async fn edit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<QuestionRequest>,
) -> ApiResult<Json<QuestionView>> {
    Ok(Json(state.services.questions.edit(&user, id, &req.title, &req.body).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.questions.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_sensitive(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SensitiveRequest>,
) -> ApiResult<Json<SensitiveResponse>> {
    let moderation = &state.services.moderation;
    let is_sensitive = match req.sensitive {
        Some(flag) => moderation.set_question_sensitive(&user, id, flag).await?,
        None => moderation.toggle_question_sensitive(&user, id).await?,
    };
    Ok(Json(SensitiveResponse { is_sensitive }))
}

pub async fn vote(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<Json<VoteResult>> {
    let result = state.services.votes.cast(&user, VoteTarget::Question(id), req.direction).await?;
    Ok(Json(result))
}

pub async fn list_answers(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<AnswerView>>> {
    Ok(Json(state.services.questions.list_answers(&user, id).await?))
}

pub async fn answer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<TextRequest>,
) -> ApiResult<(StatusCode, Json<AnswerView>)> {
    let view = state.services.questions.answer(&user, id, &req.body).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn edit_answer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<TextRequest>,
) -> ApiResult<Json<Answer>> {
    Ok(Json(state.services.questions.edit_answer(&user, id, &req.body).await?))
}

pub async fn delete_answer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.questions.delete_answer(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Toggles the correct mark; marking another answer moves it.
pub async fn mark_correct(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CorrectResponse>> {
    let is_correct = state.services.questions.mark_correct(&user, id).await?;
    Ok(Json(CorrectResponse { is_correct }))
}

pub async fn set_answer_sensitive(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SensitiveRequest>,
) -> ApiResult<Json<SensitiveResponse>> {
    let moderation = &state.services.moderation;
    let is_sensitive = match req.sensitive {
        Some(flag) => moderation.set_answer_sensitive(&user, id, flag).await?,
        None => moderation.toggle_answer_sensitive(&user, id).await?,
    };
    Ok(Json(SensitiveResponse { is_sensitive }))
}

pub async fn vote_answer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<Json<VoteResult>> {
    let result = state.services.votes.cast(&user, VoteTarget::Answer(id), req.direction).await?;
    Ok(Json(result))
}
