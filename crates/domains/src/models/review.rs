use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reviewer's assessment of an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub answer_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(answer_id: Uuid, author_id: Uuid, body: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            answer_id,
            author_id,
            body,
            created_at: Utc::now(),
        }
    }
}

/// A review with its author and helpfulness counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub author_username: String,
    pub helpful: i64,
    pub not_helpful: i64,
}

/// A truster -> trusted link between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedReviewer {
    pub truster_id: Uuid,
    pub trusted_id: Uuid,
    pub created_at: DateTime<Utc>,
}
