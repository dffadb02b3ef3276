use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use domains::UserProfile;
use services::LoginOutcome;

use crate::dto::{ChangePasswordRequest, Credentials};
use crate::extract::AuthUser;
use crate::{ApiResult, AppState};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let profile = state.services.accounts.register(&req.username, &req.password).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> ApiResult<Json<LoginOutcome>> {
    let outcome = state.services.accounts.login(&req.username, &req.password).await?;
    Ok(Json(outcome))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    state
        .services
        .accounts
        .change_password(&user, &req.current_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
