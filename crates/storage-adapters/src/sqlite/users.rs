use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{Ban, DomainError, Result, Role, User, UserRepository};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use uuid::Uuid;

use super::{db_err, SqliteStore};

macro_rules! user_select {
    () => {
        "SELECT u.id, u.username, u.password_hash, u.created_at, \
         b.reason AS ban_reason, b.issued_by AS ban_issued_by, \
         b.created_at AS ban_created_at, b.expires_at AS ban_expires_at \
         FROM users u LEFT JOIN bans b ON b.user_id = u.id"
    };
}

enum UserKey<'a> {
    Id(Uuid),
    Username(&'a str),
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    ban_reason: Option<String>,
    ban_issued_by: Option<Uuid>,
    ban_created_at: Option<DateTime<Utc>>,
    ban_expires_at: Option<DateTime<Utc>>,
}

impl UserRow {
    pub(crate) fn into_user(self, roles: BTreeSet<Role>) -> User {
        let ban = match (self.ban_reason, self.ban_issued_by, self.ban_created_at) {
            (Some(reason), Some(issued_by), Some(created_at)) => Some(Ban {
                reason,
                issued_by,
                created_at,
                expires_at: self.ban_expires_at,
            }),
            _ => None,
        };
        User {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            roles,
            ban,
            created_at: self.created_at,
        }
    }
}

fn parse_role(raw: &str) -> Result<Role> {
    raw.parse::<Role>()
        .map_err(|e| DomainError::internal(format!("corrupt role column: {e}")))
}

impl SqliteStore {
    pub(crate) async fn roles_of(&self, user_id: Uuid) -> Result<BTreeSet<Role>> {
        let raw: Vec<String> = sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        raw.iter().map(|r| parse_role(r)).collect()
    }

    /// Attaches roles to a batch of rows with one extra query.
    pub(crate) async fn hydrate_users(&self, rows: Vec<UserRow>) -> Result<Vec<User>> {
        let pairs: Vec<(Uuid, String)> = sqlx::query_as("SELECT user_id, role FROM user_roles")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut by_user: HashMap<Uuid, BTreeSet<Role>> = HashMap::new();
        for (user_id, role) in pairs {
            by_user.entry(user_id).or_default().insert(parse_role(&role)?);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let roles = by_user.remove(&row.id).unwrap_or_default();
                row.into_user(roles)
            })
            .collect())
    }

    pub(crate) async fn users_trusted_by(&self, truster_id: Uuid) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(concat!(
            user_select!(),
            " JOIN trusted_reviewers t ON t.trusted_id = u.id",
            " WHERE t.truster_id = ? ORDER BY u.username"
        ))
        .bind(truster_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        self.hydrate_users(rows).await
    }

    async fn find_user_by(&self, key: UserKey<'_>) -> Result<Option<User>> {
        let query = match key {
            UserKey::Id(id) => {
                sqlx::query_as::<_, UserRow>(concat!(user_select!(), " WHERE u.id = ?")).bind(id)
            }
            UserKey::Username(name) => {
                sqlx::query_as::<_, UserRow>(concat!(user_select!(), " WHERE u.username = ?")).bind(name)
            }
        };
        let row = query.fetch_optional(&self.pool).await.map_err(db_err)?;

        match row {
            Some(row) => {
                let roles = self.roles_of(row.id).await?;
                Ok(Some(row.into_user(roles)))
            }
            None => Ok(None),
        }
    }
}

async fn write_roles(conn: &mut SqliteConnection, user_id: Uuid, roles: &BTreeSet<Role>) -> Result<()> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    for role in roles {
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES (?, ?)")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
    }
    Ok(())
}

/// Clears votes attached to everything a user authored, plus votes on
/// content nested under their questions and answers.
async fn clear_authored_votes(tx: &mut Transaction<'_, Sqlite>, user_id: Uuid) -> Result<()> {
    sqlx::query(
        "DELETE FROM votes WHERE target_kind = 'review' AND target_id IN ( \
             SELECT r.id FROM reviews r JOIN answers a ON a.id = r.answer_id \
             WHERE r.author_id = ? OR a.author_id = ? \
                OR a.question_id IN (SELECT id FROM questions WHERE author_id = ?))",
    )
    .bind(user_id)
    .bind(user_id)
    .bind(user_id)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    sqlx::query(
        "DELETE FROM votes WHERE target_kind = 'answer' AND target_id IN ( \
             SELECT id FROM answers WHERE author_id = ? \
                OR question_id IN (SELECT id FROM questions WHERE author_id = ?))",
    )
    .bind(user_id)
    .bind(user_id)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    sqlx::query(
        "DELETE FROM votes WHERE target_kind = 'question' \
         AND target_id IN (SELECT id FROM questions WHERE author_id = ?)",
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl UserRepository for SqliteStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)")
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match db_err(e) {
                DomainError::Conflict(_) => {
                    DomainError::Conflict(format!("username `{}` is taken", user.username))
                }
                other => other,
            })?;
        write_roles(&mut tx, user.id, &user.roles).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        self.find_user_by(UserKey::Id(id)).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_user_by(UserKey::Username(username)).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(concat!(user_select!(), " ORDER BY u.username"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        self.hydrate_users(rows).await
    }

    async fn count_users(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn replace_roles(&self, id: Uuid, roles: &BTreeSet<Role>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        write_roles(&mut tx, id, roles).await?;
        tx.commit().await.map_err(db_err)
    }

    async fn set_ban(&self, id: Uuid, ban: Option<Ban>) -> Result<()> {
        match ban {
            Some(ban) => sqlx::query(
                "INSERT INTO bans (user_id, reason, issued_by, created_at, expires_at) \
                 VALUES (?, ?, ?, ?, ?) \
                 ON CONFLICT(user_id) DO UPDATE SET reason = excluded.reason, \
                 issued_by = excluded.issued_by, created_at = excluded.created_at, \
                 expires_at = excluded.expires_at",
            )
            .bind(id)
            .bind(ban.reason)
            .bind(ban.issued_by)
            .bind(ban.created_at)
            .bind(ban.expires_at),
            None => sqlx::query("DELETE FROM bans WHERE user_id = ?").bind(id),
        }
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(hash)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        clear_authored_votes(&mut tx, id).await?;

        // Everything else hangs off users via ON DELETE CASCADE.
        let deleted = sqlx::query("DELETE FROM users WHERE id = ?")
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
    use super::super::test_support::{seeded_user, store};
    use super::*;

    #[tokio::test]
    async fn usernames_are_unique_ignoring_case() {
        let store = store().await;
        seeded_user(&store, "alice", &[Role::Student]).await;

        let dup = User::new("ALICE", "hash", BTreeSet::from([Role::Student]));
        let err = store.insert_user(&dup).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let found = store.find_user_by_username("Alice").await.unwrap().unwrap();
        assert_eq!(found.username, "alice");
        assert_eq!(found.roles, BTreeSet::from([Role::Student]));
    }

    #[tokio::test]
    async fn ban_round_trips_and_lifts() {
        let store = store().await;
        let admin = seeded_user(&store, "root", &[Role::Admin]).await;
        let alice = seeded_user(&store, "alice", &[Role::Student]).await;

        let ban = Ban {
            reason: "spam".into(),
            issued_by: admin.id,
            created_at: Utc::now(),
            expires_at: None,
        };
        store.set_ban(alice.id, Some(ban)).await.unwrap();
        let loaded = store.find_user(alice.id).await.unwrap().unwrap();
        assert_eq!(loaded.ban.as_ref().map(|b| b.reason.as_str()), Some("spam"));
        assert!(loaded.active_ban().is_some());

        store.set_ban(alice.id, None).await.unwrap();
        let loaded = store.find_user(alice.id).await.unwrap().unwrap();
        assert!(loaded.ban.is_none());
    }

    #[tokio::test]
    async fn replace_roles_and_list() {
        let store = store().await;
        let alice = seeded_user(&store, "alice", &[Role::Student]).await;
        seeded_user(&store, "bob_b", &[Role::Staff]).await;

        store
            .replace_roles(alice.id, &BTreeSet::from([Role::Student, Role::Reviewer]))
            .await
            .unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "alice");
        assert_eq!(users[0].roles, BTreeSet::from([Role::Reviewer, Role::Student]));
        assert_eq!(store.count_users().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delete_user_reports_absence() {
        let store = store().await;
        let alice = seeded_user(&store, "alice", &[Role::Student]).await;
        assert!(store.delete_user(alice.id).await.unwrap());
        assert!(!store.delete_user(alice.id).await.unwrap());
        assert!(store.find_user(alice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_user_clears_votes_on_everything_they_owned() {
        use domains::{
            Answer, AnswerRepository, Question, QuestionRepository, Review, ReviewRepository,
            Vote, VoteDirection, VoteRepository, VoteTarget,
        };

        let store = store().await;
        let dora = seeded_user(&store, "dora", &[Role::Student, Role::Reviewer]).await;
        let bob = seeded_user(&store, "bob_b", &[Role::Student, Role::Reviewer]).await;
        let carol = seeded_user(&store, "carol", &[Role::Student]).await;

        let dora_q = Question::new(dora.id, "Mine".into(), "body".into());
        let bob_q = Question::new(bob.id, "Theirs".into(), "body".into());
        store.insert_question(&dora_q).await.unwrap();
        store.insert_question(&bob_q).await.unwrap();

        let dora_a = Answer::new(bob_q.id, dora.id, "dora answers".into());
        let bob_a = Answer::new(bob_q.id, bob.id, "bob answers".into());
        let bob_a_under_dora_q = Answer::new(dora_q.id, bob.id, "bob on dora".into());
        for answer in [&dora_a, &bob_a, &bob_a_under_dora_q] {
            store.insert_answer(answer).await.unwrap();
        }

        let dora_r = Review::new(bob_a.id, dora.id, "dora reviews".into());
        let bob_r_on_dora_a = Review::new(dora_a.id, bob.id, "bob reviews dora".into());
        store.insert_review(&dora_r).await.unwrap();
        store.insert_review(&bob_r_on_dora_a).await.unwrap();

        let doomed = [
            VoteTarget::Question(dora_q.id),
            VoteTarget::Answer(dora_a.id),
            VoteTarget::Answer(bob_a_under_dora_q.id),
            VoteTarget::Review(dora_r.id),
            VoteTarget::Review(bob_r_on_dora_a.id),
        ];
        let kept = [VoteTarget::Question(bob_q.id), VoteTarget::Answer(bob_a.id)];
        for target in doomed.iter().chain(kept.iter()) {
            let vote = Vote {
                user_id: carol.id,
                target: *target,
                direction: VoteDirection::Up,
                created_at: Utc::now(),
            };
            store.cast_vote(&vote).await.unwrap();
        }

        assert!(store.delete_user(dora.id).await.unwrap());

        for target in doomed {
            let left: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM votes WHERE target_kind = ? AND target_id = ?",
            )
            .bind(target.kind().as_str())
            .bind(target.id())
            .fetch_one(store.pool())
            .await
            .unwrap();
            assert_eq!(left, 0, "votes left on {target:?}");
        }
        for target in kept {
            assert_eq!(store.tally(target).await.unwrap().up, 1);
        }
    }
}
