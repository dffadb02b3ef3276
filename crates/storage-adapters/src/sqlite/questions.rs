use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    Answer, AnswerRepository, AnswerView, Question, QuestionFilter, QuestionRepository,
    QuestionView, Result,
};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use super::{db_err, like_pattern, SqliteStore};

macro_rules! question_view_select {
    () => {
        "SELECT q.id, q.author_id, q.title, q.body, q.is_sensitive, q.created_at, q.updated_at, \
         u.username AS author_username, \
         (SELECT COALESCE(SUM(CASE v.direction WHEN 'up' THEN 1 ELSE -1 END), 0) \
            FROM votes v WHERE v.target_kind = 'question' AND v.target_id = q.id) AS score, \
         (SELECT COUNT(*) FROM answers a WHERE a.question_id = q.id) AS answer_count, \
         EXISTS (SELECT 1 FROM answers a WHERE a.question_id = q.id AND a.is_correct = 1) \
            AS has_correct_answer \
         FROM questions q JOIN users u ON u.id = q.author_id"
    };
}

macro_rules! answer_view_select {
    () => {
        "SELECT a.id, a.question_id, a.author_id, a.body, a.is_correct, a.is_sensitive, \
         a.created_at, a.updated_at, u.username AS author_username, \
         (SELECT COALESCE(SUM(CASE v.direction WHEN 'up' THEN 1 ELSE -1 END), 0) \
            FROM votes v WHERE v.target_kind = 'answer' AND v.target_id = a.id) AS score \
         FROM answers a JOIN users u ON u.id = a.author_id"
    };
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: Uuid,
    author_id: Uuid,
    title: String,
    body: String,
    is_sensitive: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: row.id,
            author_id: row.author_id,
            title: row.title,
            body: row.body,
            is_sensitive: row.is_sensitive,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct QuestionViewRow {
    #[sqlx(flatten)]
    question: QuestionRow,
    author_username: String,
    score: i64,
    answer_count: i64,
    has_correct_answer: bool,
}

impl From<QuestionViewRow> for QuestionView {
    fn from(row: QuestionViewRow) -> Self {
        QuestionView {
            question: row.question.into(),
            author_username: row.author_username,
            score: row.score,
            answer_count: row.answer_count,
            has_correct_answer: row.has_correct_answer,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AnswerRow {
    id: Uuid,
    question_id: Uuid,
    author_id: Uuid,
    body: String,
    is_correct: bool,
    is_sensitive: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        Answer {
            id: row.id,
            question_id: row.question_id,
            author_id: row.author_id,
            body: row.body,
            is_correct: row.is_correct,
            is_sensitive: row.is_sensitive,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AnswerViewRow {
    #[sqlx(flatten)]
    answer: AnswerRow,
    author_username: String,
    score: i64,
}

/// Appends the WHERE clause for a listing filter.
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &QuestionFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(text) = filter.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(text);
        qb.push(" AND (q.title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR q.body LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if filter.unanswered_only {
        qb.push(" AND NOT EXISTS (SELECT 1 FROM answers a WHERE a.question_id = q.id)");
    }

    if let Some(truster) = filter.trusted_by {
        qb.push(
            " AND EXISTS (SELECT 1 FROM answers a \
               JOIN reviews r ON r.answer_id = a.id \
               JOIN trusted_reviewers t ON t.trusted_id = r.author_id \
               WHERE a.question_id = q.id AND t.truster_id = ",
        )
        .push_bind(truster)
        .push(")");
    }

    if !filter.include_sensitive {
        match filter.viewer_id {
            Some(viewer) => {
                qb.push(" AND (q.is_sensitive = 0 OR q.author_id = ")
                    .push_bind(viewer)
                    .push(")");
            }
            None => {
                qb.push(" AND q.is_sensitive = 0");
            }
        }
    }
}

async fn clear_votes_under_answer(
    conn: &mut sqlx::SqliteConnection,
    answer_id: Uuid,
) -> Result<()> {
    sqlx::query(
        "DELETE FROM votes WHERE target_kind = 'review' \
         AND target_id IN (SELECT id FROM reviews WHERE answer_id = ?)",
    )
    .bind(answer_id)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    sqlx::query("DELETE FROM votes WHERE target_kind = 'answer' AND target_id = ?")
        .bind(answer_id)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl QuestionRepository for SqliteStore {
    async fn insert_question(&self, question: &Question) -> Result<()> {
        sqlx::query(
            "INSERT INTO questions (id, author_id, title, body, is_sensitive, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(question.id)
        .bind(question.author_id)
        .bind(&question.title)
        .bind(&question.body)
        .bind(question.is_sensitive)
        .bind(question.created_at)
        .bind(question.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_question(&self, id: Uuid) -> Result<Option<Question>> {
        let row = sqlx::query_as::<_, QuestionRow>(
            "SELECT id, author_id, title, body, is_sensitive, created_at, updated_at \
             FROM questions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn question_view(&self, id: Uuid) -> Result<Option<QuestionView>> {
        let row = sqlx::query_as::<_, QuestionViewRow>(concat!(question_view_select!(), " WHERE q.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<QuestionView>> {
        let mut qb = QueryBuilder::<Sqlite>::new(question_view_select!());
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY q.created_at DESC, q.id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows = qb
            .build_query_as::<QuestionViewRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_question(&self, question: &Question) -> Result<()> {
        sqlx::query("UPDATE questions SET title = ?, body = ?, updated_at = ? WHERE id = ?")
            .bind(&question.title)
            .bind(&question.body)
            .bind(question.updated_at)
            .bind(question.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_question_sensitive(&self, id: Uuid, sensitive: bool) -> Result<()> {
        sqlx::query("UPDATE questions SET is_sensitive = ? WHERE id = ?")
            .bind(sensitive)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_question(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "DELETE FROM votes WHERE target_kind = 'review' AND target_id IN ( \
                 SELECT r.id FROM reviews r JOIN answers a ON a.id = r.answer_id \
                 WHERE a.question_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        sqlx::query(
            "DELETE FROM votes WHERE target_kind = 'answer' \
             AND target_id IN (SELECT id FROM answers WHERE question_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        sqlx::query("DELETE FROM votes WHERE target_kind = 'question' AND target_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let deleted = sqlx::query("DELETE FROM questions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .rows_affected();

        tx.commit().await.map_err(db_err)?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl AnswerRepository for SqliteStore {
    async fn insert_answer(&self, answer: &Answer) -> Result<()> {
        sqlx::query(
            "INSERT INTO answers \
             (id, question_id, author_id, body, is_correct, is_sensitive, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(answer.id)
        .bind(answer.question_id)
        .bind(answer.author_id)
        .bind(&answer.body)
        .bind(answer.is_correct)
        .bind(answer.is_sensitive)
        .bind(answer.created_at)
        .bind(answer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_answer(&self, id: Uuid) -> Result<Option<Answer>> {
        let row = sqlx::query_as::<_, AnswerRow>(
            "SELECT id, question_id, author_id, body, is_correct, is_sensitive, created_at, updated_at \
             FROM answers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn list_answers(&self, question_id: Uuid) -> Result<Vec<AnswerView>> {
        // Correct answer first, then oldest first.
        let rows = sqlx::query_as::<_, AnswerViewRow>(concat!(
            answer_view_select!(),
            " WHERE a.question_id = ? ORDER BY a.is_correct DESC, a.created_at ASC, a.id ASC"
        ))
        .bind(question_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|row| AnswerView {
                answer: row.answer.into(),
                author_username: row.author_username,
                score: row.score,
            })
            .collect())
    }

    async fn update_answer(&self, answer: &Answer) -> Result<()> {
        sqlx::query("UPDATE answers SET body = ?, updated_at = ? WHERE id = ?")
            .bind(&answer.body)
            .bind(answer.updated_at)
            .bind(answer.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_answer_sensitive(&self, id: Uuid, sensitive: bool) -> Result<()> {
        sqlx::query("UPDATE answers SET is_sensitive = ? WHERE id = ?")
            .bind(sensitive)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_correct_answer(&self, question_id: Uuid, answer_id: Option<Uuid>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("UPDATE answers SET is_correct = 0 WHERE question_id = ? AND is_correct = 1")
            .bind(question_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if let Some(answer_id) = answer_id {
            sqlx::query("UPDATE answers SET is_correct = 1 WHERE id = ? AND question_id = ?")
                .bind(answer_id)
                .bind(question_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)
    }

    async fn delete_answer(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        clear_votes_under_answer(&mut tx, id).await?;

        let deleted = sqlx::query("DELETE FROM answers WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .rows_affected();

        tx.commit().await.map_err(db_err)?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use domains::{Role, Review, ReviewRepository, TrustRepository, TrustedReviewer, Vote,
        VoteDirection, VoteRepository, VoteTarget};

    use super::super::test_support::{seeded_user, store};
    use super::*;

    fn filter() -> QuestionFilter {
        QuestionFilter { limit: 20, ..QuestionFilter::default() }
    }

    #[tokio::test]
    async fn view_counts_answers_and_score() {
        let store = store().await;
        let alice = seeded_user(&store, "alice", &[Role::Student]).await;
        let bob = seeded_user(&store, "bob_b", &[Role::Student]).await;

        let q = Question::new(alice.id, "Lifetimes?".into(), "What is 'a".into());
        store.insert_question(&q).await.unwrap();
        store.insert_answer(&Answer::new(q.id, bob.id, "A region.".into())).await.unwrap();
        store
            .cast_vote(&Vote {
                user_id: bob.id,
                target: VoteTarget::Question(q.id),
                direction: VoteDirection::Up,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let view = store.question_view(q.id).await.unwrap().unwrap();
        assert_eq!(view.author_username, "alice");
        assert_eq!(view.answer_count, 1);
        assert_eq!(view.score, 1);
        assert!(!view.has_correct_answer);
    }

    #[tokio::test]
    async fn filters_text_unanswered_and_sensitive() {
        let store = store().await;
        let alice = seeded_user(&store, "alice", &[Role::Student]).await;
        let bob = seeded_user(&store, "bob_b", &[Role::Student]).await;

        let borrow = Question::new(alice.id, "Borrow checker".into(), "100% stuck".into());
        let traits = Question::new(alice.id, "Traits".into(), "dyn vs impl".into());
        let secret = Question::new(bob.id, "Grades".into(), "private".into());
        for q in [&borrow, &traits, &secret] {
            store.insert_question(q).await.unwrap();
        }
        store.set_question_sensitive(secret.id, true).await.unwrap();
        store.insert_answer(&Answer::new(traits.id, bob.id, "Use generics.".into())).await.unwrap();

        let hits = store
            .list_questions(&QuestionFilter { text: Some("100%".into()), ..filter() })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].question.id, borrow.id);

        let open = store
            .list_questions(&QuestionFilter { unanswered_only: true, ..filter() })
            .await
            .unwrap();
        assert_eq!(open.len(), 1);

        let as_alice = store
            .list_questions(&QuestionFilter { viewer_id: Some(alice.id), ..filter() })
            .await
            .unwrap();
        assert!(as_alice.iter().all(|v| v.question.id != secret.id));

        let as_bob = store
            .list_questions(&QuestionFilter { viewer_id: Some(bob.id), ..filter() })
            .await
            .unwrap();
        assert!(as_bob.iter().any(|v| v.question.id == secret.id));
    }

    #[tokio::test]
    async fn trusted_filter_requires_a_trusted_review() {
        let store = store().await;
        let alice = seeded_user(&store, "alice", &[Role::Student]).await;
        let rita = seeded_user(&store, "rita", &[Role::Reviewer]).await;

        let reviewed = Question::new(alice.id, "Reviewed".into(), "body".into());
        let plain = Question::new(alice.id, "Plain".into(), "body".into());
        store.insert_question(&reviewed).await.unwrap();
        store.insert_question(&plain).await.unwrap();
        let answer = Answer::new(reviewed.id, alice.id, "answer".into());
        store.insert_answer(&answer).await.unwrap();
        store.insert_review(&Review::new(answer.id, rita.id, "solid".into())).await.unwrap();

        let trusted = QuestionFilter { trusted_by: Some(alice.id), ..filter() };
        assert!(store.list_questions(&trusted).await.unwrap().is_empty());

        store
            .add_trust(&TrustedReviewer {
                truster_id: alice.id,
                trusted_id: rita.id,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let hits = store.list_questions(&trusted).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].question.id, reviewed.id);
    }

    #[tokio::test]
    async fn only_one_correct_answer_per_question() {
        let store = store().await;
        let alice = seeded_user(&store, "alice", &[Role::Instructor]).await;
        let q = Question::new(alice.id, "Which?".into(), "body".into());
        store.insert_question(&q).await.unwrap();
        let first = Answer::new(q.id, alice.id, "first".into());
        let second = Answer::new(q.id, alice.id, "second".into());
        store.insert_answer(&first).await.unwrap();
        store.insert_answer(&second).await.unwrap();

        store.set_correct_answer(q.id, Some(first.id)).await.unwrap();
        store.set_correct_answer(q.id, Some(second.id)).await.unwrap();

        let answers = store.list_answers(q.id).await.unwrap();
        let correct: Vec<_> = answers.iter().filter(|a| a.answer.is_correct).collect();
        assert_eq!(correct.len(), 1);
        assert_eq!(correct[0].answer.id, second.id);
        assert_eq!(answers[0].answer.id, second.id);

        store.set_correct_answer(q.id, None).await.unwrap();
        assert!(!store.question_view(q.id).await.unwrap().unwrap().has_correct_answer);
    }

    #[tokio::test]
    async fn deleting_question_clears_nested_votes() {
        let store = store().await;
        let alice = seeded_user(&store, "alice", &[Role::Student]).await;
        let bob = seeded_user(&store, "bob_b", &[Role::Student]).await;
        let q = Question::new(alice.id, "Gone soon".into(), "body".into());
        store.insert_question(&q).await.unwrap();
        let a = Answer::new(q.id, alice.id, "answer".into());
        store.insert_answer(&a).await.unwrap();
        store
            .cast_vote(&Vote {
                user_id: bob.id,
                target: VoteTarget::Answer(a.id),
                direction: VoteDirection::Down,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(store.delete_question(q.id).await.unwrap());
        assert!(store.find_answer(a.id).await.unwrap().is_none());
        let tally = store.tally(VoteTarget::Answer(a.id)).await.unwrap();
        assert_eq!(tally.up + tally.down, 0);
        assert!(!store.delete_question(q.id).await.unwrap());
    }
}
