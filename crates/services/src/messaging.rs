//! # MessagingService
//!
//! One-to-one chats. A chat exists at most once per pair of users and is
//! only visible to its two participants.

use std::sync::Arc;

use chrono::Utc;
use domains::validation::{validate_text, TextKind};
use domains::{
    Chat, ChatRepository, ChatSummary, DomainError, Message, Permission, Result, User,
    UserRepository,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub struct MessagingService {
    chats: Arc<dyn ChatRepository>,
    users: Arc<dyn UserRepository>,
}

impl MessagingService {
    pub fn new(chats: Arc<dyn ChatRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { chats, users }
    }

    /// Returns the chat with `other`, creating it on first contact.
    #[instrument(skip_all, fields(actor = %actor.id, other = other))]
    pub async fn open_chat(&self, actor: &User, other: &str) -> Result<Chat> {
        actor.require(Permission::Message)?;
        let peer = self
            .users
            .find_user_by_username(other)
            .await?
            .ok_or_else(|| DomainError::not_found("user", other))?;
        if peer.id == actor.id {
            return Err(DomainError::InvalidRequest("you cannot message yourself".into()));
        }

        if let Some(chat) = self.chats.find_chat_between(actor.id, peer.id).await? {
            debug!(chat_id = %chat.id, "reusing chat");
            return Ok(chat);
        }

        let chat = Chat::between(actor.id, peer.id);
        match self.chats.insert_chat(&chat).await {
            Ok(()) => {
                info!(chat_id = %chat.id, "chat opened");
                Ok(chat)
            }
            // The other side opened it between our lookup and insert.
            Err(DomainError::Conflict(_)) => self
                .chats
                .find_chat_between(actor.id, peer.id)
                .await?
                .ok_or_else(|| DomainError::internal("chat vanished after a conflicting insert")),
            Err(e) => Err(e),
        }
    }

    pub async fn list_chats(&self, actor: &User) -> Result<Vec<ChatSummary>> {
        self.chats.list_chats(actor.id).await
    }

    #[instrument(skip_all, fields(actor = %actor.id, chat_id = %chat_id))]
    pub async fn send(&self, actor: &User, chat_id: Uuid, body: &str) -> Result<Message> {
        actor.require(Permission::Message)?;
        let chat = self.participant_chat(actor, chat_id).await?;
        let body = validate_text(TextKind::Message, body)?;

        let message = Message::new(chat.id, actor.id, body);
        self.chats.insert_message(&message).await?;
        debug!(message_id = %message.id, "message sent");
        Ok(message)
    }

    pub async fn history(&self, actor: &User, chat_id: Uuid) -> Result<Vec<Message>> {
        let chat = self.participant_chat(actor, chat_id).await?;
        self.chats.list_messages(chat.id).await
    }

    /// Marks the other participant's messages as read; returns how many changed.
    pub async fn mark_read(&self, actor: &User, chat_id: Uuid) -> Result<u64> {
        let chat = self.participant_chat(actor, chat_id).await?;
        self.chats.mark_read(chat.id, actor.id, Utc::now()).await
    }

    pub async fn unread_total(&self, actor: &User) -> Result<i64> {
        self.chats.unread_total(actor.id).await
    }

    async fn participant_chat(&self, actor: &User, chat_id: Uuid) -> Result<Chat> {
        self.chats
            .find_chat(chat_id)
            .await?
            .filter(|c| c.includes(actor.id))
            .ok_or_else(|| DomainError::not_found("chat", chat_id))
    }
}
