//! # ReviewService
//!
//! Reviewer assessments of answers. Readers can narrow a listing to the
//! reviewers they trust.

use std::sync::Arc;

use domains::validation::{validate_text, TextKind};
use domains::{
    Answer, AnswerRepository, DomainError, Permission, QuestionRepository, Result, Review,
    ReviewRepository, ReviewView, User,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::questions::visible_answer;

pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    questions: Arc<dyn QuestionRepository>,
    answers: Arc<dyn AnswerRepository>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        questions: Arc<dyn QuestionRepository>,
        answers: Arc<dyn AnswerRepository>,
    ) -> Self {
        Self { reviews, questions, answers }
    }

    #[instrument(skip_all, fields(actor = %actor.id, answer_id = %answer_id))]
    pub async fn write_review(&self, actor: &User, answer_id: Uuid, body: &str) -> Result<ReviewView> {
        actor.require(Permission::WriteReview)?;
        let answer = self.load_visible_answer(actor, answer_id).await?;

        if answer.author_id == actor.id {
            return Err(DomainError::InvalidRequest("you cannot review your own answer".into()));
        }
        if self.reviews.find_review_by_author(answer_id, actor.id).await?.is_some() {
            return Err(DomainError::Conflict("you already reviewed this answer".into()));
        }

        let body = validate_text(TextKind::Review, body)?;
        let review = Review::new(answer_id, actor.id, body);
        self.reviews.insert_review(&review).await?;
        info!(review_id = %review.id, "review posted");

        Ok(ReviewView {
            review,
            author_username: actor.username.clone(),
            helpful: 0,
            not_helpful: 0,
        })
    }

    pub async fn list_reviews(&self, viewer: &User, answer_id: Uuid, trusted_only: bool) -> Result<Vec<ReviewView>> {
        self.load_visible_answer(viewer, answer_id).await?;
        self.reviews
            .list_reviews(answer_id, trusted_only.then_some(viewer.id))
            .await
    }

    #[instrument(skip_all, fields(actor = %actor.id, review_id = %id))]
    pub async fn delete_review(&self, actor: &User, id: Uuid) -> Result<()> {
        let review = self
            .reviews
            .find_review(id)
            .await?
            .ok_or_else(|| DomainError::not_found("review", id))?;
        if review.author_id != actor.id {
            actor.require(Permission::DeleteAnyContent)?;
        }
        self.reviews.delete_review(id).await?;
        info!("review deleted");
        Ok(())
    }

    async fn load_visible_answer(&self, viewer: &User, id: Uuid) -> Result<Answer> {
        visible_answer(self.questions.as_ref(), self.answers.as_ref(), viewer, id).await
    }
}
