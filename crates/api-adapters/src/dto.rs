//! Request and response bodies that are not plain domain types.

use domains::{Role, VoteDirection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct BanRequest {
    pub reason: String,
    /// Omitted for a permanent ban
    pub duration_hours: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub title: String,
    pub body: String,
}

/// Body of an answer, review or chat message.
#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub body: String,
}

/// `sensitive` omitted flips the current flag.
#[derive(Debug, Default, Deserialize)]
pub struct SensitiveRequest {
    pub sensitive: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub direction: VoteDirection,
}

#[derive(Debug, Deserialize)]
pub struct UsernameRequest {
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReviewListQuery {
    pub trusted_only: bool,
}

#[derive(Debug, Serialize)]
pub struct SensitiveResponse {
    pub is_sensitive: bool,
}

#[derive(Debug, Serialize)]
pub struct CorrectResponse {
    pub is_correct: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkedReadResponse {
    pub marked: u64,
}

#[derive(Debug, Serialize)]
pub struct UnreadResponse {
    pub unread: i64,
}
