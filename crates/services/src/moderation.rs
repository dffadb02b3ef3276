//! # ModerationService
//!
//! Account bans and the sensitive-content flags on questions and answers.

use std::sync::Arc;

use chrono::{Duration, Utc};
use domains::validation::{validate_text, TextKind};
use domains::{
    AnswerRepository, Ban, DomainError, Permission, QuestionRepository, Result, Role, User,
    UserProfile, UserRepository,
};
use tracing::{info, instrument};
use uuid::Uuid;

pub struct ModerationService {
    users: Arc<dyn UserRepository>,
    questions: Arc<dyn QuestionRepository>,
    answers: Arc<dyn AnswerRepository>,
}

impl ModerationService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        questions: Arc<dyn QuestionRepository>,
        answers: Arc<dyn AnswerRepository>,
    ) -> Self {
        Self { users, questions, answers }
    }

    /// Bans `target_id`. Without a duration the ban is permanent.
    #[instrument(skip_all, fields(actor = %actor.id, target = %target_id))]
    pub async fn ban(
        &self,
        actor: &User,
        target_id: Uuid,
        reason: &str,
        duration: Option<Duration>,
    ) -> Result<UserProfile> {
        actor.require(Permission::BanUsers)?;
        if actor.id == target_id {
            return Err(DomainError::InvalidRequest("you cannot ban yourself".into()));
        }

        let mut target = self
            .users
            .find_user(target_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", target_id))?;
        if target.has_role(Role::Admin) && !actor.has_role(Role::Admin) {
            return Err(DomainError::forbidden("only an admin can ban an admin"));
        }

        let reason = validate_text(TextKind::BanReason, reason)?;
        let now = Utc::now();
        let expires_at = duration
            .map(|d| {
                now.checked_add_signed(d)
                    .ok_or_else(|| DomainError::InvalidRequest("ban duration is out of range".into()))
            })
            .transpose()?;
        let ban = Ban {
            reason,
            issued_by: actor.id,
            created_at: now,
            expires_at,
        };
        self.users.set_ban(target.id, Some(ban.clone())).await?;
        info!(expires_at = ?ban.expires_at, "user banned");

        target.ban = Some(ban);
        Ok(UserProfile::from(&target))
    }

    #[instrument(skip_all, fields(actor = %actor.id, target = %target_id))]
    pub async fn unban(&self, actor: &User, target_id: Uuid) -> Result<UserProfile> {
        actor.require(Permission::BanUsers)?;
        let mut target = self
            .users
            .find_user(target_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", target_id))?;

        self.users.set_ban(target.id, None).await?;
        info!("user unbanned");

        target.ban = None;
        Ok(UserProfile::from(&target))
    }

    pub async fn set_question_sensitive(&self, actor: &User, id: Uuid, sensitive: bool) -> Result<bool> {
        actor.require(Permission::FlagSensitive)?;
        self.questions
            .find_question(id)
            .await?
            .ok_or_else(|| DomainError::not_found("question", id))?;
        self.questions.set_question_sensitive(id, sensitive).await?;
        info!(question_id = %id, sensitive, actor = %actor.id, "question sensitivity set");
        Ok(sensitive)
    }

    /// Flips the flag and returns the new value.
    pub async fn toggle_question_sensitive(&self, actor: &User, id: Uuid) -> Result<bool> {
        actor.require(Permission::FlagSensitive)?;
        let question = self
            .questions
            .find_question(id)
            .await?
            .ok_or_else(|| DomainError::not_found("question", id))?;
        let sensitive = !question.is_sensitive;
        self.questions.set_question_sensitive(id, sensitive).await?;
        info!(question_id = %id, sensitive, actor = %actor.id, "question sensitivity toggled");
        Ok(sensitive)
    }

    pub async fn set_answer_sensitive(&self, actor: &User, id: Uuid, sensitive: bool) -> Result<bool> {
        actor.require(Permission::FlagSensitive)?;
        self.answers
            .find_answer(id)
            .await?
            .ok_or_else(|| DomainError::not_found("answer", id))?;
        self.answers.set_answer_sensitive(id, sensitive).await?;
        info!(answer_id = %id, sensitive, actor = %actor.id, "answer sensitivity set");
        Ok(sensitive)
    }

    pub async fn toggle_answer_sensitive(&self, actor: &User, id: Uuid) -> Result<bool> {
        actor.require(Permission::FlagSensitive)?;
        let answer = self
            .answers
            .find_answer(id)
            .await?
            .ok_or_else(|| DomainError::not_found("answer", id))?;
        let sensitive = !answer.is_sensitive;
        self.answers.set_answer_sensitive(id, sensitive).await?;
        info!(answer_id = %id, sensitive, actor = %actor.id, "answer sensitivity toggled");
        Ok(sensitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{question_by, user};
    use domains::{MockAnswerRepository, MockQuestionRepository, MockUserRepository};

    fn service(
        users: MockUserRepository,
        questions: MockQuestionRepository,
    ) -> ModerationService {
        ModerationService::new(Arc::new(users), Arc::new(questions), Arc::new(MockAnswerRepository::new()))
    }

    #[tokio::test]
    async fn staff_can_ban_students() {
        let staff = user("staffer", &[Role::Staff]);
        let student = user("alice", &[Role::Student]);
        let id = student.id;

        let mut users = MockUserRepository::new();
        users.expect_find_user().returning(move |_| Ok(Some(student.clone())));
        users
            .expect_set_ban()
            .withf(|_, ban| ban.as_ref().is_some_and(|b| b.reason == "spamming" && b.expires_at.is_some()))
            .times(1)
            .returning(|_, _| Ok(()));

        let profile = service(users, MockQuestionRepository::new())
            .ban(&staff, id, "  spamming ", Some(Duration::days(3)))
            .await
            .unwrap();
        assert!(profile.banned);
    }

    #[tokio::test]
    async fn staff_cannot_ban_admins() {
        let staff = user("staffer", &[Role::Staff]);
        let admin = user("root", &[Role::Admin]);
        let id = admin.id;

        let mut users = MockUserRepository::new();
        users.expect_find_user().returning(move |_| Ok(Some(admin.clone())));
        users.expect_set_ban().never();

        let err = service(users, MockQuestionRepository::new())
            .ban(&staff, id, "nope", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn ban_past_the_calendar_is_rejected() {
        let admin = user("root", &[Role::Admin]);
        let student = user("alice", &[Role::Student]);
        let id = student.id;

        let mut users = MockUserRepository::new();
        users.expect_find_user().returning(move |_| Ok(Some(student.clone())));
        users.expect_set_ban().never();

        let err = service(users, MockQuestionRepository::new())
            .ban(&admin, id, "spam", Some(Duration::hours(10_000_000_000)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn students_cannot_ban() {
        let student = user("alice", &[Role::Student]);
        let err = service(MockUserRepository::new(), MockQuestionRepository::new())
            .ban(&student, Uuid::now_v7(), "because", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn nobody_bans_themselves() {
        let admin = user("root", &[Role::Admin]);
        let err = service(MockUserRepository::new(), MockQuestionRepository::new())
            .ban(&admin, admin.id, "oops", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn toggle_flips_question_flag() {
        let instructor = user("prof", &[Role::Instructor]);
        let mut q = question_by(Uuid::now_v7());
        q.is_sensitive = true;
        let id = q.id;

        let mut questions = MockQuestionRepository::new();
        questions.expect_find_question().returning(move |_| Ok(Some(q.clone())));
        questions
            .expect_set_question_sensitive()
            .withf(|_, flag| !*flag)
            .times(1)
            .returning(|_, _| Ok(()));

        let now = service(MockUserRepository::new(), questions)
            .toggle_question_sensitive(&instructor, id)
            .await
            .unwrap();
        assert!(!now);
    }

    #[tokio::test]
    async fn reviewers_cannot_flag() {
        let reviewer = user("rev", &[Role::Reviewer]);
        let err = service(MockUserRepository::new(), MockQuestionRepository::new())
            .set_question_sensitive(&reviewer, Uuid::now_v7(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
