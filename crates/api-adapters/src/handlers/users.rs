use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Duration;
use domains::{DomainError, Role, UserProfile};
use uuid::Uuid;

use crate::dto::{BanRequest, RoleRequest};
use crate::extract::AuthUser;
use crate::{ApiResult, AppState};

pub async fn list(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<Vec<UserProfile>>> {
    Ok(Json(state.services.accounts.list_users(&user).await?))
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.services.accounts.get_user(id).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.accounts.delete_user(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn grant_role(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RoleRequest>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.services.accounts.grant_role(&user, id, req.role).await?))
}

pub async fn revoke_role(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, role)): Path<(Uuid, String)>,
) -> ApiResult<Json<UserProfile>> {
    let role: Role = role
        .parse()
        .map_err(|e: domains::UnknownRole| DomainError::InvalidRequest(e.to_string()))?;
    Ok(Json(state.services.accounts.revoke_role(&user, id, role).await?))
}

pub async fn ban(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<BanRequest>,
) -> ApiResult<Json<UserProfile>> {
    let duration = match req.duration_hours {
        Some(hours) if hours <= 0 => {
            return Err(DomainError::InvalidRequest("duration_hours must be positive".into()).into())
        }
        Some(hours) => Some(Duration::try_hours(hours).ok_or_else(|| {
            DomainError::InvalidRequest("duration_hours is out of range".into())
        })?),
        None => None,
    };
    let profile = state.services.moderation.ban(&user, id, &req.reason, duration).await?;
    Ok(Json(profile))
}

pub async fn unban(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.services.moderation.unban(&user, id).await?))
}
