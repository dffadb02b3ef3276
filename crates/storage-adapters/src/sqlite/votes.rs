use async_trait::async_trait;
use domains::{
    DomainError, Result, Vote, VoteDirection, VoteOutcome, VoteRepository, VoteTally, VoteTarget,
};

use super::{db_err, SqliteStore};

fn parse_direction(raw: &str) -> Result<VoteDirection> {
    VoteDirection::parse(raw)
        .ok_or_else(|| DomainError::internal(format!("corrupt vote direction `{raw}`")))
}

#[async_trait]
impl VoteRepository for SqliteStore {
    /// Applies the toggle rule inside one transaction so two concurrent
    /// casts by the same user cannot both see "no prior vote".
    async fn cast_vote(&self, vote: &Vote) -> Result<VoteOutcome> {
        let kind = vote.target.kind().as_str();
        let target_id = vote.target.id();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT direction FROM votes WHERE user_id = ? AND target_kind = ? AND target_id = ?",
        )
        .bind(vote.user_id)
        .bind(kind)
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        let existing = existing.as_deref().map(parse_direction).transpose()?;

        let outcome = VoteOutcome::decide(existing, vote.direction);
        match outcome {
            VoteOutcome::Recorded => {
                sqlx::query(
                    "INSERT INTO votes (user_id, target_kind, target_id, direction, created_at) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(vote.user_id)
                .bind(kind)
                .bind(target_id)
                .bind(vote.direction.as_str())
                .bind(vote.created_at)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
            VoteOutcome::Removed => {
                sqlx::query(
                    "DELETE FROM votes WHERE user_id = ? AND target_kind = ? AND target_id = ?",
                )
                .bind(vote.user_id)
                .bind(kind)
                .bind(target_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
            VoteOutcome::Switched => {
                sqlx::query(
                    "UPDATE votes SET direction = ?, created_at = ? \
                     WHERE user_id = ? AND target_kind = ? AND target_id = ?",
                )
                .bind(vote.direction.as_str())
                .bind(vote.created_at)
                .bind(vote.user_id)
                .bind(kind)
                .bind(target_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
        }

        tx.commit().await.map_err(db_err)?;
        Ok(outcome)
    }

    async fn tally(&self, target: VoteTarget) -> Result<VoteTally> {
        let (up, down): (i64, i64) = sqlx::query_as(
            "SELECT \
               COALESCE(SUM(CASE direction WHEN 'up' THEN 1 ELSE 0 END), 0), \
               COALESCE(SUM(CASE direction WHEN 'down' THEN 1 ELSE 0 END), 0) \
             FROM votes WHERE target_kind = ? AND target_id = ?",
        )
        .bind(target.kind().as_str())
        .bind(target.id())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(VoteTally { up, down })
    }
}
