//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be used by the binary.
//! Repositories are async and object safe so services can hold them as
//! `Arc<dyn ...>`. Password hashing is async so adapters can move the
//! work off the runtime; tokens and the login throttle are synchronous.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{
    Answer, AnswerView, Ban, Chat, ChatSummary, Message, Question, QuestionFilter, QuestionView,
    Review, ReviewView, Role, TrustedReviewer, User, Vote, VoteOutcome, VoteTally, VoteTarget,
};

/// Account persistence: users, their roles and bans.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username is taken (case-insensitive).
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn count_users(&self) -> Result<i64>;
    async fn replace_roles(&self, id: Uuid, roles: &BTreeSet<Role>) -> Result<()>;
    /// `None` lifts any existing ban.
    async fn set_ban(&self, id: Uuid, ban: Option<Ban>) -> Result<()>;
    async fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<()>;
    /// Removes the user and everything they authored. Returns false if absent.
    async fn delete_user(&self, id: Uuid) -> Result<bool>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn insert_question(&self, question: &Question) -> Result<()>;
    async fn find_question(&self, id: Uuid) -> Result<Option<Question>>;
    async fn question_view(&self, id: Uuid) -> Result<Option<QuestionView>>;
    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<QuestionView>>;
    /// Persists title, body and updated_at.
    async fn update_question(&self, question: &Question) -> Result<()>;
    async fn set_question_sensitive(&self, id: Uuid, sensitive: bool) -> Result<()>;
    /// Cascades to answers, reviews and every attached vote.
    async fn delete_question(&self, id: Uuid) -> Result<bool>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AnswerRepository: Send + Sync {
    async fn insert_answer(&self, answer: &Answer) -> Result<()>;
    async fn find_answer(&self, id: Uuid) -> Result<Option<Answer>>;
    async fn list_answers(&self, question_id: Uuid) -> Result<Vec<AnswerView>>;
    /// Persists body and updated_at.
    async fn update_answer(&self, answer: &Answer) -> Result<()>;
    async fn set_answer_sensitive(&self, id: Uuid, sensitive: bool) -> Result<()>;
    /// Clears the correct flag on every answer of the question, then sets it
    /// on `answer_id` if given.
    async fn set_correct_answer(&self, question_id: Uuid, answer_id: Option<Uuid>) -> Result<()>;
    /// Cascades to reviews and every attached vote.
    async fn delete_answer(&self, id: Uuid) -> Result<bool>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn insert_review(&self, review: &Review) -> Result<()>;
    async fn find_review(&self, id: Uuid) -> Result<Option<Review>>;
    async fn find_review_by_author(&self, answer_id: Uuid, author_id: Uuid) -> Result<Option<Review>>;
    /// With `trusted_by`, only reviews written by reviewers that user trusts.
    async fn list_reviews(&self, answer_id: Uuid, trusted_by: Option<Uuid>) -> Result<Vec<ReviewView>>;
    async fn delete_review(&self, id: Uuid) -> Result<bool>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Applies the toggle rule of [`VoteOutcome::decide`] atomically.
    async fn cast_vote(&self, vote: &Vote) -> Result<VoteOutcome>;
    async fn tally(&self, target: VoteTarget) -> Result<VoteTally>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TrustRepository: Send + Sync {
    /// Adding a link that already exists is a no-op.
    async fn add_trust(&self, link: &TrustedReviewer) -> Result<()>;
    async fn remove_trust(&self, truster_id: Uuid, trusted_id: Uuid) -> Result<bool>;
    async fn list_trusted(&self, truster_id: Uuid) -> Result<Vec<User>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn find_chat_between(&self, a: Uuid, b: Uuid) -> Result<Option<Chat>>;
    async fn find_chat(&self, id: Uuid) -> Result<Option<Chat>>;
    async fn insert_chat(&self, chat: &Chat) -> Result<()>;
    async fn list_chats(&self, user_id: Uuid) -> Result<Vec<ChatSummary>>;
    async fn insert_message(&self, message: &Message) -> Result<()>;
    /// Oldest first.
    async fn list_messages(&self, chat_id: Uuid) -> Result<Vec<Message>>;
    /// Marks every unread message in the chat not sent by `reader` as read.
    async fn mark_read(&self, chat_id: Uuid, reader: Uuid, at: DateTime<Utc>) -> Result<u64>;
    async fn unread_total(&self, user_id: Uuid) -> Result<i64>;
}

/// Password hashing contract. Both calls are deliberately slow.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &str) -> Result<String>;
    async fn verify(&self, password: &str, hash: &str) -> bool;
}

/// A bearer token handed out at login.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Session token contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenService: Send + Sync {
    fn issue(&self, user: &User) -> Result<SessionToken>;
    /// Returns the user id the token was issued for.
    fn verify(&self, token: &str) -> Result<Uuid>;
}

/// Failed-login throttling keyed by username.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait LoginThrottle: Send + Sync {
    /// Errors with `RateLimitExceeded` while the key is locked out.
    fn check(&self, key: &str) -> Result<()>;
    fn record_failure(&self, key: &str);
    fn clear(&self, key: &str);
}
