use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A question posted to the class board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    /// Hidden from viewers without `ViewSensitive` unless they wrote it
    pub is_sensitive: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn new(author_id: Uuid, title: String, body: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            author_id,
            title,
            body,
            is_sensitive: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A question joined with its author and aggregate counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    #[serde(flatten)]
    pub question: Question,
    pub author_username: String,
    pub score: i64,
    pub answer_count: i64,
    pub has_correct_answer: bool,
}

/// Storage-level listing filter, already resolved against the viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    /// Case-insensitive substring matched against title and body
    pub text: Option<String>,
    pub unanswered_only: bool,
    /// Keep only questions with an answer reviewed by someone this user trusts
    pub trusted_by: Option<Uuid>,
    pub include_sensitive: bool,
    /// Sensitive questions written by this user stay visible
    pub viewer_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub is_correct: bool,
    pub is_sensitive: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(question_id: Uuid, author_id: Uuid, body: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            question_id,
            author_id,
            body,
            is_correct: false,
            is_sensitive: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerView {
    #[serde(flatten)]
    pub answer: Answer,
    pub author_username: String,
    pub score: i64,
}
