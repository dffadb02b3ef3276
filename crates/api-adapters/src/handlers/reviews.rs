use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use domains::{ReviewView, VoteTarget};
use services::VoteResult;
use uuid::Uuid;

use crate::dto::{ReviewListQuery, TextRequest, VoteRequest};
use crate::extract::AuthUser;
use crate::{ApiResult, AppState};

/// `?trusted_only=true` keeps reviews by the caller's trusted reviewers.
pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(answer_id): Path<Uuid>,
    Query(query): Query<ReviewListQuery>,
) -> ApiResult<Json<Vec<ReviewView>>> {
    let reviews = state
        .services
        .reviews
        .list_reviews(&user, answer_id, query.trusted_only)
        .await?;
    Ok(Json(reviews))
}

pub async fn write(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(answer_id): Path<Uuid>,
    Json(req): Json<TextRequest>,
) -> ApiResult<(StatusCode, Json<ReviewView>)> {
    let view = state.services.reviews.write_review(&user, answer_id, &req.body).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.reviews.delete_review(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn vote(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<Json<VoteResult>> {
    let result = state.services.votes.cast(&user, VoteTarget::Review(id), req.direction).await?;
    Ok(Json(result))
}
