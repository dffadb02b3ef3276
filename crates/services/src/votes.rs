//! # VoteService
//!
//! Up/down votes on questions and answers, helpful/not-helpful on reviews.
//! Casting the same vote twice withdraws it; casting the opposite flips it.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    AnswerRepository, DomainError, Permission, QuestionRepository, Result, ReviewRepository, User,
    Vote, VoteDirection, VoteOutcome, VoteRepository, VoteTally, VoteTarget,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::questions::{visible_answer, visible_question};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteResult {
    pub outcome: VoteOutcome,
    pub tally: VoteTally,
    pub score: i64,
}

pub struct VoteService {
    votes: Arc<dyn VoteRepository>,
    questions: Arc<dyn QuestionRepository>,
    answers: Arc<dyn AnswerRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl VoteService {
    pub fn new(
        votes: Arc<dyn VoteRepository>,
        questions: Arc<dyn QuestionRepository>,
        answers: Arc<dyn AnswerRepository>,
        reviews: Arc<dyn ReviewRepository>,
    ) -> Self {
        Self { votes, questions, answers, reviews }
    }

    #[instrument(skip_all, fields(actor = %actor.id, %target, direction = direction.as_str()))]
    pub async fn cast(&self, actor: &User, target: VoteTarget, direction: VoteDirection) -> Result<VoteResult> {
        actor.require(Permission::Vote)?;

        let author_id = self.visible_author(actor, target).await?;
        if author_id == actor.id {
            return Err(DomainError::InvalidRequest("you cannot vote on your own content".into()));
        }

        let vote = Vote { user_id: actor.id, target, direction, created_at: Utc::now() };
        let outcome = self.votes.cast_vote(&vote).await?;
        let tally = self.votes.tally(target).await?;
        info!(?outcome, score = tally.score(), "vote cast");

        Ok(VoteResult { outcome, tally, score: tally.score() })
    }

    /// Author of the target, or not-found when it, or anything it hangs
    /// under, is missing or hidden.
    async fn visible_author(&self, viewer: &User, target: VoteTarget) -> Result<Uuid> {
        let questions = self.questions.as_ref();
        let answers = self.answers.as_ref();
        match target {
            VoteTarget::Question(id) => Ok(visible_question(questions, viewer, id).await?.author_id),
            VoteTarget::Answer(id) => Ok(visible_answer(questions, answers, viewer, id).await?.author_id),
            VoteTarget::Review(id) => {
                let review = self
                    .reviews
                    .find_review(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("review", id))?;
                match visible_answer(questions, answers, viewer, review.answer_id).await {
                    Ok(_) => Ok(review.author_id),
                    Err(DomainError::NotFound(..)) => Err(DomainError::not_found("review", id)),
                    Err(e) => Err(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{answer_to, question_by, user};
    use domains::{
        MockAnswerRepository, MockQuestionRepository, MockReviewRepository, MockVoteRepository,
        Review, Role,
    };

    fn service(votes: MockVoteRepository, questions: MockQuestionRepository) -> VoteService {
        VoteService::new(
            Arc::new(votes),
            Arc::new(questions),
            Arc::new(MockAnswerRepository::new()),
            Arc::new(MockReviewRepository::new()),
        )
    }

    #[tokio::test]
    async fn vote_reports_outcome_and_tally() {
        let alice = user("alice", &[Role::Student]);
        let q = question_by(Uuid::now_v7());
        let qid = q.id;

        let mut questions = MockQuestionRepository::new();
        questions.expect_find_question().returning(move |_| Ok(Some(q.clone())));
        let mut votes = MockVoteRepository::new();
        votes
            .expect_cast_vote()
            .withf(move |v| v.target == VoteTarget::Question(qid) && v.direction == VoteDirection::Up)
            .returning(|_| Ok(VoteOutcome::Recorded));
        votes.expect_tally().returning(|_| Ok(VoteTally { up: 3, down: 1 }));

        let result = service(votes, questions)
            .cast(&alice, VoteTarget::Question(qid), VoteDirection::Up)
            .await
            .unwrap();
        assert_eq!(result.outcome, VoteOutcome::Recorded);
        assert_eq!(result.score, 2);
    }

    #[tokio::test]
    async fn self_votes_rejected() {
        let alice = user("alice", &[Role::Student]);
        let q = question_by(alice.id);
        let qid = q.id;

        let mut questions = MockQuestionRepository::new();
        questions.expect_find_question().returning(move |_| Ok(Some(q.clone())));
        let mut votes = MockVoteRepository::new();
        votes.expect_cast_vote().never();

        let err = service(votes, questions)
            .cast(&alice, VoteTarget::Question(qid), VoteDirection::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn missing_target_is_not_found() {
        let alice = user("alice", &[Role::Student]);
        let mut questions = MockQuestionRepository::new();
        questions.expect_find_question().returning(|_| Ok(None));

        let err = service(MockVoteRepository::new(), questions)
            .cast(&alice, VoteTarget::Question(Uuid::now_v7()), VoteDirection::Down)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound("question", _)));
    }

    #[tokio::test]
    async fn content_under_hidden_question_is_not_found() {
        let bob = user("bob_b", &[Role::Student]);
        let mut q = question_by(Uuid::now_v7());
        q.is_sensitive = true;
        let a = answer_to(q.id, Uuid::now_v7());
        let aid = a.id;
        let review = Review::new(aid, Uuid::now_v7(), "fine".into());
        let rid = review.id;

        let mut questions = MockQuestionRepository::new();
        questions.expect_find_question().returning(move |_| Ok(Some(q.clone())));
        let mut answers = MockAnswerRepository::new();
        answers.expect_find_answer().returning(move |_| Ok(Some(a.clone())));
        let mut reviews = MockReviewRepository::new();
        reviews.expect_find_review().returning(move |_| Ok(Some(review.clone())));
        let mut votes = MockVoteRepository::new();
        votes.expect_cast_vote().never();

        let svc = VoteService::new(Arc::new(votes), Arc::new(questions), Arc::new(answers), Arc::new(reviews));
        assert!(matches!(
            svc.cast(&bob, VoteTarget::Answer(aid), VoteDirection::Up).await,
            Err(DomainError::NotFound("answer", _))
        ));
        assert!(matches!(
            svc.cast(&bob, VoteTarget::Review(rid), VoteDirection::Up).await,
            Err(DomainError::NotFound("review", _))
        ));
    }
}
