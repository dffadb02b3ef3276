use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use domains::UserProfile;

use crate::dto::UsernameRequest;
use crate::extract::AuthUser;
use crate::{ApiResult, AppState};

pub async fn list(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<Vec<UserProfile>>> {
    Ok(Json(state.services.trust.list_trusted(&user).await?))
}

pub async fn add(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<UsernameRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let reviewer = state.services.trust.trust(&user, &req.username).await?;
    Ok((StatusCode::CREATED, Json(reviewer)))
}

pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    state.services.trust.untrust(&user, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}
