use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{Chat, ChatRepository, ChatSummary, DomainError, Message, Result};
use uuid::Uuid;

use super::{db_err, SqliteStore};

#[derive(sqlx::FromRow)]
struct ChatRow {
    id: Uuid,
    user_a: Uuid,
    user_b: Uuid,
    created_at: DateTime<Utc>,
}

impl From<ChatRow> for Chat {
    fn from(row: ChatRow) -> Self {
        Chat {
            id: row.id,
            user_a: row.user_a,
            user_b: row.user_b,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    chat_id: Uuid,
    sender_id: Uuid,
    body: String,
    sent_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            chat_id: row.chat_id,
            sender_id: row.sender_id,
            body: row.body,
            sent_at: row.sent_at,
            read_at: row.read_at,
        }
    }
}

/// One inbox row; the `last_*` columns are all NULL for an empty chat.
#[derive(sqlx::FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    chat: ChatRow,
    other_user_id: Uuid,
    other_username: String,
    unread: i64,
    last_id: Option<Uuid>,
    last_sender_id: Option<Uuid>,
    last_body: Option<String>,
    last_sent_at: Option<DateTime<Utc>>,
    last_read_at: Option<DateTime<Utc>>,
}

impl From<SummaryRow> for ChatSummary {
    fn from(row: SummaryRow) -> Self {
        let last_message = match (row.last_id, row.last_sender_id, row.last_body, row.last_sent_at) {
            (Some(id), Some(sender_id), Some(body), Some(sent_at)) => Some(Message {
                id,
                chat_id: row.chat.id,
                sender_id,
                body,
                sent_at,
                read_at: row.last_read_at,
            }),
            _ => None,
        };
        ChatSummary {
            chat: row.chat.into(),
            other_user_id: row.other_user_id,
            other_username: row.other_username,
            last_message,
            unread: row.unread,
        }
    }
}

#[async_trait]
impl ChatRepository for SqliteStore {
    async fn find_chat_between(&self, a: Uuid, b: Uuid) -> Result<Option<Chat>> {
        let (user_a, user_b) = if a <= b { (a, b) } else { (b, a) };
        let row = sqlx::query_as::<_, ChatRow>(
            "SELECT id, user_a, user_b, created_at FROM chats WHERE user_a = ? AND user_b = ?",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn find_chat(&self, id: Uuid) -> Result<Option<Chat>> {
        let row = sqlx::query_as::<_, ChatRow>(
            "SELECT id, user_a, user_b, created_at FROM chats WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn insert_chat(&self, chat: &Chat) -> Result<()> {
        sqlx::query("INSERT INTO chats (id, user_a, user_b, created_at) VALUES (?, ?, ?, ?)")
            .bind(chat.id)
            .bind(chat.user_a)
            .bind(chat.user_b)
            .bind(chat.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match db_err(e) {
                DomainError::Conflict(_) => {
                    DomainError::Conflict("chat between these users already exists".into())
                }
                other => other,
            })?;
        Ok(())
    }

    async fn list_chats(&self, user_id: Uuid) -> Result<Vec<ChatSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT c.id, c.user_a, c.user_b, c.created_at, \
             o.id AS other_user_id, o.username AS other_username, \
             (SELECT COUNT(*) FROM messages u \
                WHERE u.chat_id = c.id AND u.sender_id <> ? AND u.read_at IS NULL) AS unread, \
             m.id AS last_id, m.sender_id AS last_sender_id, m.body AS last_body, \
             m.sent_at AS last_sent_at, m.read_at AS last_read_at \
             FROM chats c \
             JOIN users o ON o.id = CASE WHEN c.user_a = ? THEN c.user_b ELSE c.user_a END \
             LEFT JOIN messages m ON m.id = ( \
                SELECT id FROM messages WHERE chat_id = c.id \
                ORDER BY sent_at DESC, id DESC LIMIT 1) \
             WHERE c.user_a = ? OR c.user_b = ? \
             ORDER BY COALESCE(m.sent_at, c.created_at) DESC",
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_message(&self, message: &Message) -> Result<()> {
        sqlx::query(
            "INSERT INTO messages (id, chat_id, sender_id, body, sent_at, read_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id)
        .bind(message.chat_id)
        .bind(message.sender_id)
        .bind(&message.body)
        .bind(message.sent_at)
        .bind(message.read_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_messages(&self, chat_id: Uuid) -> Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, chat_id, sender_id, body, sent_at, read_at FROM messages \
             WHERE chat_id = ? ORDER BY sent_at ASC, id ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_read(&self, chat_id: Uuid, reader: Uuid, at: DateTime<Utc>) -> Result<u64> {
        let updated = sqlx::query(
            "UPDATE messages SET read_at = ? \
             WHERE chat_id = ? AND sender_id <> ? AND read_at IS NULL",
        )
        .bind(at)
        .bind(chat_id)
        .bind(reader)
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .rows_affected();
        Ok(updated)
    }

    async fn unread_total(&self, user_id: Uuid) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages m JOIN chats c ON c.id = m.chat_id \
             WHERE (c.user_a = ? OR c.user_b = ?) AND m.sender_id <> ? AND m.read_at IS NULL",
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}
