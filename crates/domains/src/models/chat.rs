use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A direct-message conversation between exactly two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    /// Always the smaller of the two participant ids
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    /// Builds a chat with the participant pair stored in canonical order,
    /// so (x, y) and (y, x) map to the same row.
    pub fn between(first: Uuid, second: Uuid) -> Self {
        let (user_a, user_b) = if first <= second { (first, second) } else { (second, first) };
        Self {
            id: Uuid::now_v7(),
            user_a,
            user_b,
            created_at: Utc::now(),
        }
    }

    pub fn includes(&self, user: Uuid) -> bool {
        self.user_a == user || self.user_b == user
    }

    /// The participant that is not `user`.
    pub fn other(&self, user: Uuid) -> Uuid {
        if self.user_a == user { self.user_b } else { self.user_a }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(chat_id: Uuid, sender_id: Uuid, body: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            chat_id,
            sender_id,
            body,
            sent_at: Utc::now(),
            read_at: None,
        }
    }
}

/// One row of a user's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub chat: Chat,
    pub other_user_id: Uuid,
    pub other_username: String,
    pub last_message: Option<Message>,
    pub unread: i64,
}
