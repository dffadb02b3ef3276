use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    DomainError, Result, Review, ReviewRepository, ReviewView, TrustRepository, TrustedReviewer,
    User,
};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use super::{db_err, SqliteStore};

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    answer_id: Uuid,
    author_id: Uuid,
    body: String,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            answer_id: row.answer_id,
            author_id: row.author_id,
            body: row.body,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewViewRow {
    #[sqlx(flatten)]
    review: ReviewRow,
    author_username: String,
    helpful: i64,
    not_helpful: i64,
}

const REVIEW_COLUMNS: &str = "SELECT id, answer_id, author_id, body, created_at FROM reviews";

#[async_trait]
impl ReviewRepository for SqliteStore {
    async fn insert_review(&self, review: &Review) -> Result<()> {
        sqlx::query(
            "INSERT INTO reviews (id, answer_id, author_id, body, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(review.id)
        .bind(review.answer_id)
        .bind(review.author_id)
        .bind(&review.body)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match db_err(e) {
            DomainError::Conflict(_) => {
                DomainError::Conflict("answer already reviewed by this user".into())
            }
            other => other,
        })?;
        Ok(())
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!("{REVIEW_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn find_review_by_author(&self, answer_id: Uuid, author_id: Uuid) -> Result<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "{REVIEW_COLUMNS} WHERE answer_id = ? AND author_id = ?"
        ))
        .bind(answer_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn list_reviews(&self, answer_id: Uuid, trusted_by: Option<Uuid>) -> Result<Vec<ReviewView>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT r.id, r.answer_id, r.author_id, r.body, r.created_at, \
             u.username AS author_username, \
             (SELECT COUNT(*) FROM votes v WHERE v.target_kind = 'review' \
                AND v.target_id = r.id AND v.direction = 'up') AS helpful, \
             (SELECT COUNT(*) FROM votes v WHERE v.target_kind = 'review' \
                AND v.target_id = r.id AND v.direction = 'down') AS not_helpful \
             FROM reviews r JOIN users u ON u.id = r.author_id WHERE r.answer_id = ",
        );
        qb.push_bind(answer_id);
        if let Some(truster) = trusted_by {
            qb.push(
                " AND r.author_id IN (SELECT trusted_id FROM trusted_reviewers WHERE truster_id = ",
            )
            .push_bind(truster)
            .push(")");
        }
        qb.push(" ORDER BY r.created_at ASC, r.id ASC");

        let rows = qb
            .build_query_as::<ReviewViewRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|row| ReviewView {
                review: row.review.into(),
                author_username: row.author_username,
                helpful: row.helpful,
                not_helpful: row.not_helpful,
            })
            .collect())
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM votes WHERE target_kind = 'review' AND target_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        let deleted = sqlx::query("DELETE FROM reviews WHERE id = ?")
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
impl TrustRepository for SqliteStore {
    async fn add_trust(&self, link: &TrustedReviewer) -> Result<()> {
        // Re-trusting is a no-op rather than a conflict.
        sqlx::query(
            "INSERT INTO trusted_reviewers (truster_id, trusted_id, created_at) VALUES (?, ?, ?) \
             ON CONFLICT(truster_id, trusted_id) DO NOTHING",
        )
        .bind(link.truster_id)
        .bind(link.trusted_id)
        .bind(link.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn remove_trust(&self, truster_id: Uuid, trusted_id: Uuid) -> Result<bool> {
        let removed = sqlx::query(
            "DELETE FROM trusted_reviewers WHERE truster_id = ? AND trusted_id = ?",
        )
        .bind(truster_id)
        .bind(trusted_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .rows_affected();
        Ok(removed > 0)
    }

    async fn list_trusted(&self, truster_id: Uuid) -> Result<Vec<User>> {
        self.users_trusted_by(truster_id).await
    }
}
