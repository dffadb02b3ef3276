//! # services
//!
//! Business rules for Classboard. Every service talks to storage and auth
//! only through the port traits in `domains`, so the same rules run against
//! SQLite in production and mocks in tests.

pub mod accounts;
pub mod messaging;
pub mod moderation;
pub mod questions;
pub mod reviews;
pub mod trust;
pub mod votes;

use std::sync::Arc;

use domains::{
    AnswerRepository, ChatRepository, LoginThrottle, PasswordHasher, QuestionRepository,
    ReviewRepository, TokenService, TrustRepository, UserRepository, VoteRepository,
};

pub use accounts::{AccountService, LoginOutcome};
pub use messaging::MessagingService;
pub use moderation::ModerationService;
pub use questions::{QuestionQuery, QuestionService};
pub use reviews::ReviewService;
pub use trust::TrustService;
pub use votes::{VoteResult, VoteService};

/// Every port implementation the services need, wired once at startup.
#[derive(Clone)]
pub struct Ports {
    pub users: Arc<dyn UserRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub answers: Arc<dyn AnswerRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub votes: Arc<dyn VoteRepository>,
    pub trust: Arc<dyn TrustRepository>,
    pub chats: Arc<dyn ChatRepository>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenService>,
    pub throttle: Arc<dyn LoginThrottle>,
}

/// The full set of application services.
pub struct Services {
    pub accounts: AccountService,
    pub moderation: ModerationService,
    pub questions: QuestionService,
    pub reviews: ReviewService,
    pub votes: VoteService,
    pub trust: TrustService,
    pub messaging: MessagingService,
}

impl Services {
    pub fn new(ports: Ports) -> Self {
        Self {
            accounts: AccountService::new(
                ports.users.clone(),
                ports.hasher,
                ports.tokens,
                ports.throttle,
            ),
            moderation: ModerationService::new(
                ports.users.clone(),
                ports.questions.clone(),
                ports.answers.clone(),
            ),
            questions: QuestionService::new(ports.questions.clone(), ports.answers.clone()),
            reviews: ReviewService::new(
                ports.reviews.clone(),
                ports.questions.clone(),
                ports.answers.clone(),
            ),
            votes: VoteService::new(ports.votes, ports.questions, ports.answers, ports.reviews),
            trust: TrustService::new(ports.trust, ports.users.clone()),
            messaging: MessagingService::new(ports.chats, ports.users),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeSet;

    use chrono::{Duration, Utc};
    use domains::{Answer, Ban, Question, Role, User};
    use uuid::Uuid;

    pub fn user(name: &str, roles: &[Role]) -> User {
        User::new(name, "hashed:unused", roles.iter().copied().collect::<BTreeSet<_>>())
    }

    pub fn ban(reason: &str, lasts: Option<Duration>) -> Ban {
        let now = Utc::now();
        Ban {
            reason: reason.into(),
            issued_by: Uuid::now_v7(),
            created_at: now,
            expires_at: lasts.map(|d| now + d),
        }
    }

    pub fn question_by(author: Uuid) -> Question {
        Question::new(author, "How do traits work?".into(), "I am confused by dyn.".into())
    }

    pub fn answer_to(question: Uuid, author: Uuid) -> Answer {
        Answer::new(question, author, "Read the book chapter on traits.".into())
    }
}
