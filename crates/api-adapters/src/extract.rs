use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domains::{DomainError, User};

use crate::{ApiError, AppState};

/// The caller, resolved from an `Authorization: Bearer <token>` header.
/// Banned or deleted accounts are rejected here, so handlers never see them.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| DomainError::Unauthorized("missing bearer token".into()))?;

        let user = state.services.accounts.authenticate(token).await?;
        Ok(AuthUser(user))
    }
}
