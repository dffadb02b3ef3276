//! # Domain Models
//!
//! These structs represent the core entities of Classboard.
//! We use UUID v7 for time-ordered, globally unique identification.

mod chat;
mod question;
mod review;
mod user;
mod vote;

pub use chat::{Chat, ChatSummary, Message};
pub use question::{Answer, AnswerView, Question, QuestionFilter, QuestionView};
pub use review::{Review, ReviewView, TrustedReviewer};
pub use user::{Ban, Role, UnknownRole, User, UserProfile};
pub use vote::{TargetKind, Vote, VoteDirection, VoteOutcome, VoteTally, VoteTarget};
