//! # QuestionService
//!
//! Questions, their answers, and the correct-answer mark.
//!
//! Sensitive rows are hidden from viewers who lack `ViewSensitive` unless
//! they wrote the row; a hidden row reports as not found.

use std::sync::Arc;

use chrono::Utc;
use domains::validation::{validate_text, TextKind};
use domains::{
    Answer, AnswerRepository, AnswerView, DomainError, Permission, Question, QuestionFilter,
    QuestionRepository, QuestionView, Result, User,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// A viewer's search request before it is resolved into a [`QuestionFilter`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuestionQuery {
    pub text: Option<String>,
    pub unanswered_only: bool,
    pub trusted_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub(crate) fn can_see(viewer: &User, author_id: Uuid, sensitive: bool) -> bool {
    !sensitive || author_id == viewer.id || viewer.can(Permission::ViewSensitive)
}

pub(crate) async fn visible_question(
    questions: &dyn QuestionRepository,
    viewer: &User,
    id: Uuid,
) -> Result<Question> {
    questions
        .find_question(id)
        .await?
        .filter(|q| can_see(viewer, q.author_id, q.is_sensitive))
        .ok_or_else(|| DomainError::not_found("question", id))
}

/// An answer the viewer may see: neither it nor its question is hidden.
pub(crate) async fn visible_answer(
    questions: &dyn QuestionRepository,
    answers: &dyn AnswerRepository,
    viewer: &User,
    id: Uuid,
) -> Result<Answer> {
    let answer = answers
        .find_answer(id)
        .await?
        .filter(|a| can_see(viewer, a.author_id, a.is_sensitive))
        .ok_or_else(|| DomainError::not_found("answer", id))?;
    match visible_question(questions, viewer, answer.question_id).await {
        Ok(_) => Ok(answer),
        Err(DomainError::NotFound(..)) => Err(DomainError::not_found("answer", id)),
        Err(e) => Err(e),
    }
}

pub struct QuestionService {
    questions: Arc<dyn QuestionRepository>,
    answers: Arc<dyn AnswerRepository>,
}

impl QuestionService {
    pub fn new(questions: Arc<dyn QuestionRepository>, answers: Arc<dyn AnswerRepository>) -> Self {
        Self { questions, answers }
    }

    // ── Questions ───────────────────────────────────────────────────────────

    #[instrument(skip_all, fields(actor = %actor.id))]
    pub async fn ask(&self, actor: &User, title: &str, body: &str) -> Result<QuestionView> {
        actor.require(Permission::AskQuestion)?;
        let title = validate_text(TextKind::QuestionTitle, title)?;
        let body = validate_text(TextKind::QuestionBody, body)?;

        let question = Question::new(actor.id, title, body);
        self.questions.insert_question(&question).await?;
        info!(question_id = %question.id, "question posted");

        Ok(QuestionView {
            question,
            author_username: actor.username.clone(),
            score: 0,
            answer_count: 0,
            has_correct_answer: false,
        })
    }

    pub async fn get(&self, viewer: &User, id: Uuid) -> Result<QuestionView> {
        let view = self
            .questions
            .question_view(id)
            .await?
            .ok_or_else(|| DomainError::not_found("question", id))?;
        let q = &view.question;
        if !can_see(viewer, q.author_id, q.is_sensitive) {
            return Err(DomainError::not_found("question", id));
        }
        Ok(view)
    }

    pub async fn search(&self, viewer: &User, query: &QuestionQuery) -> Result<Vec<QuestionView>> {
        let filter = QuestionFilter {
            text: query
                .text
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            unanswered_only: query.unanswered_only,
            trusted_by: query.trusted_only.then_some(viewer.id),
            include_sensitive: viewer.can(Permission::ViewSensitive),
            viewer_id: Some(viewer.id),
            limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: query.offset.unwrap_or(0).max(0),
        };
        self.questions.list_questions(&filter).await
    }

    /// Newest non-sensitive questions, for anonymous pages.
    pub async fn recent_public(&self, limit: i64) -> Result<Vec<QuestionView>> {
        let filter = QuestionFilter {
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            ..QuestionFilter::default()
        };
        self.questions.list_questions(&filter).await
    }

    #[instrument(skip_all, fields(actor = %actor.id, question_id = %id))]
    pub async fn edit(&self, actor: &User, id: Uuid, title: &str, body: &str) -> Result<QuestionView> {
        let mut question = self.load_visible_question(actor, id).await?;
        if question.author_id != actor.id {
            return Err(DomainError::forbidden("only the author can edit a question"));
        }

        question.title = validate_text(TextKind::QuestionTitle, title)?;
        question.body = validate_text(TextKind::QuestionBody, body)?;
        question.updated_at = Utc::now();
        self.questions.update_question(&question).await?;
        info!("question edited");

        self.get(actor, id).await
    }

    #[instrument(skip_all, fields(actor = %actor.id, question_id = %id))]
    pub async fn delete(&self, actor: &User, id: Uuid) -> Result<()> {
        let question = self.load_visible_question(actor, id).await?;
        if question.author_id != actor.id {
            actor.require(Permission::DeleteAnyContent)?;
        }
        self.questions.delete_question(id).await?;
        info!("question deleted");
        Ok(())
    }

    // ── Answers ─────────────────────────────────────────────────────────────

    #[instrument(skip_all, fields(actor = %actor.id, question_id = %question_id))]
    pub async fn answer(&self, actor: &User, question_id: Uuid, body: &str) -> Result<AnswerView> {
        actor.require(Permission::Answer)?;
        let question = self.load_visible_question(actor, question_id).await?;
        let body = validate_text(TextKind::Answer, body)?;

        let answer = Answer::new(question.id, actor.id, body);
        self.answers.insert_answer(&answer).await?;
        info!(answer_id = %answer.id, "answer posted");

        Ok(AnswerView { answer, author_username: actor.username.clone(), score: 0 })
    }

    pub async fn list_answers(&self, viewer: &User, question_id: Uuid) -> Result<Vec<AnswerView>> {
        self.load_visible_question(viewer, question_id).await?;
        let answers = self.answers.list_answers(question_id).await?;
        Ok(answers
            .into_iter()
            .filter(|a| can_see(viewer, a.answer.author_id, a.answer.is_sensitive))
            .collect())
    }

    #[instrument(skip_all, fields(actor = %actor.id, answer_id = %id))]
    pub async fn edit_answer(&self, actor: &User, id: Uuid, body: &str) -> Result<Answer> {
        let mut answer = self.load_visible_answer(actor, id).await?;
        if answer.author_id != actor.id {
            return Err(DomainError::forbidden("only the author can edit an answer"));
        }
        answer.body = validate_text(TextKind::Answer, body)?;
        answer.updated_at = Utc::now();
        self.answers.update_answer(&answer).await?;
        info!("answer edited");
        Ok(answer)
    }

    #[instrument(skip_all, fields(actor = %actor.id, answer_id = %id))]
    pub async fn delete_answer(&self, actor: &User, id: Uuid) -> Result<()> {
        let answer = self.load_visible_answer(actor, id).await?;
        if answer.author_id != actor.id {
            actor.require(Permission::DeleteAnyContent)?;
        }
        self.answers.delete_answer(id).await?;
        info!("answer deleted");
        Ok(())
    }

    /// Toggles the correct mark on an answer and returns the new state.
    /// At most one answer per question carries the mark.
    #[instrument(skip_all, fields(actor = %actor.id, answer_id = %answer_id))]
    pub async fn mark_correct(&self, actor: &User, answer_id: Uuid) -> Result<bool> {
        let answer = self.load_visible_answer(actor, answer_id).await?;
        let question = self.load_visible_question(actor, answer.question_id).await?;
        if question.author_id != actor.id {
            actor.require(Permission::MarkCorrect)?;
        }

        let correct = !answer.is_correct;
        self.answers
            .set_correct_answer(question.id, correct.then_some(answer.id))
            .await?;
        info!(correct, "correct answer updated");
        Ok(correct)
    }

    async fn load_visible_question(&self, viewer: &User, id: Uuid) -> Result<Question> {
        visible_question(self.questions.as_ref(), viewer, id).await
    }

    async fn load_visible_answer(&self, viewer: &User, id: Uuid) -> Result<Answer> {
        visible_answer(self.questions.as_ref(), self.answers.as_ref(), viewer, id).await
    }
}
