//! # AccountService
//!
//! Registration, login, session checks and the admin-only role and user
//! management operations.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use domains::validation::{validate_password, validate_username};
use domains::{
    DomainError, LoginThrottle, PasswordHasher, Permission, Result, Role, SessionToken,
    TokenService, User, UserProfile, UserRepository,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const BAD_CREDENTIALS: &str = "invalid username or password";

/// Hashed once, then verified against whenever a login names an unknown
/// user, so that path costs as much as a wrong password.
const TIMING_DUMMY_PASSWORD: &str = "classboard-timing-dummy";

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub user: UserProfile,
    pub session: SessionToken,
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenService>,
    throttle: Arc<dyn LoginThrottle>,
    dummy_hash: OnceLock<String>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenService>,
        throttle: Arc<dyn LoginThrottle>,
    ) -> Self {
        Self { users, hasher, tokens, throttle, dummy_hash: OnceLock::new() }
    }

    /// Creates a student account. The first account ever created is also
    /// made an admin so a fresh install can be administered.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<UserProfile> {
        validate_username(username)?;
        validate_password(password)?;

        if self.users.find_user_by_username(username).await?.is_some() {
            return Err(DomainError::Conflict(format!("username `{username}` is taken")));
        }

        let first = self.users.count_users().await? == 0;
        let mut roles = BTreeSet::from([Role::Student]);
        if first {
            roles.insert(Role::Admin);
        }

        let hash = self.hasher.hash(password).await?;
        let user = User::new(username, hash, roles);
        self.users.insert_user(&user).await?;

        info!(user_id = %user.id, first, "account registered");
        Ok(UserProfile::from(&user))
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let key = username.to_ascii_lowercase();
        self.throttle.check(&key)?;

        let verified = match self.users.find_user_by_username(username).await? {
            Some(user) => {
                let matches = self.hasher.verify(password, &user.password_hash).await;
                matches.then_some(user)
            }
            None => {
                self.verify_dummy(password).await;
                None
            }
        };
        let Some(user) = verified else {
            self.throttle.record_failure(&key);
            warn!("failed login attempt");
            return Err(DomainError::Unauthorized(BAD_CREDENTIALS.into()));
        };
        self.throttle.clear(&key);

        if let Some(ban) = user.active_ban() {
            warn!(user_id = %user.id, "banned user tried to log in");
            return Err(DomainError::Banned { reason: ban.reason.clone() });
        }

        let session = self.tokens.issue(&user)?;
        info!(user_id = %user.id, "login succeeded");
        Ok(LoginOutcome { user: UserProfile::from(&user), session })
    }

    /// Resolves a bearer token to a live, unbanned user. Bans and deletions
    /// apply to tokens issued before them.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let user_id = self.tokens.verify(token)?;
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| DomainError::Unauthorized("account no longer exists".into()))?;

        if let Some(ban) = user.active_ban() {
            return Err(DomainError::Banned { reason: ban.reason.clone() });
        }
        Ok(user)
    }

    #[instrument(skip_all, fields(user_id = %actor.id))]
    pub async fn change_password(&self, actor: &User, current: &str, new: &str) -> Result<()> {
        if !self.hasher.verify(current, &actor.password_hash).await {
            return Err(DomainError::Unauthorized("current password is incorrect".into()));
        }
        validate_password(new)?;
        let hash = self.hasher.hash(new).await?;
        self.users.update_password_hash(actor.id, &hash).await?;
        info!("password changed");
        Ok(())
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserProfile> {
        let user = self.load(id).await?;
        Ok(UserProfile::from(&user))
    }

    pub async fn list_users(&self, actor: &User) -> Result<Vec<UserProfile>> {
        actor.require(Permission::ListUsers)?;
        let users = self.users.list_users().await?;
        Ok(users.iter().map(UserProfile::from).collect())
    }

    #[instrument(skip_all, fields(actor = %actor.id, target = %target_id, %role))]
    pub async fn grant_role(&self, actor: &User, target_id: Uuid, role: Role) -> Result<UserProfile> {
        actor.require(Permission::ManageRoles)?;
        let mut target = self.load(target_id).await?;

        if target.roles.insert(role) {
            self.users.replace_roles(target.id, &target.roles).await?;
            info!("role granted");
        }
        Ok(UserProfile::from(&target))
    }

    #[instrument(skip_all, fields(actor = %actor.id, target = %target_id, %role))]
    pub async fn revoke_role(&self, actor: &User, target_id: Uuid, role: Role) -> Result<UserProfile> {
        actor.require(Permission::ManageRoles)?;
        if actor.id == target_id && role == Role::Admin {
            return Err(DomainError::InvalidRequest(
                "admins cannot revoke their own admin role".into(),
            ));
        }

        let mut target = self.load(target_id).await?;
        if !target.roles.remove(&role) {
            return Ok(UserProfile::from(&target));
        }
        if target.roles.is_empty() {
            return Err(DomainError::InvalidRequest("a user must keep at least one role".into()));
        }

        self.users.replace_roles(target.id, &target.roles).await?;
        info!("role revoked");
        Ok(UserProfile::from(&target))
    }

    #[instrument(skip_all, fields(actor = %actor.id, target = %target_id))]
    pub async fn delete_user(&self, actor: &User, target_id: Uuid) -> Result<()> {
        actor.require(Permission::DeleteUsers)?;
        if actor.id == target_id {
            return Err(DomainError::InvalidRequest("you cannot delete your own account".into()));
        }
        if !self.users.delete_user(target_id).await? {
            return Err(DomainError::not_found("user", target_id));
        }
        info!("user deleted");
        Ok(())
    }

    async fn verify_dummy(&self, password: &str) {
        let dummy = match self.dummy_hash.get() {
            Some(hash) => hash,
            None => match self.hasher.hash(TIMING_DUMMY_PASSWORD).await {
                Ok(hash) => self.dummy_hash.get_or_init(|| hash),
                Err(err) => {
                    warn!(error = %err, "could not build the dummy hash");
                    return;
                }
            },
        };
        self.hasher.verify(password, dummy).await;
    }

        async fn load(&self, id: Uuid) -> Result<User> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ban, user};
    use domains::{MockLoginThrottle, MockPasswordHasher, MockTokenService, MockUserRepository};

    struct Mocks {
        users: MockUserRepository,
        hasher: MockPasswordHasher,
        tokens: MockTokenService,
        throttle: MockLoginThrottle,
    }

    impl Mocks {
        fn new() -> Self {
            let mut hasher = MockPasswordHasher::new();
            hasher.expect_hash().returning(|p| Ok(format!("hashed:{p}")));
            hasher
                .expect_verify()
                .returning(|p, h| h == format!("hashed:{p}"));
            let mut throttle = MockLoginThrottle::new();
            throttle.expect_check().returning(|_| Ok(()));
            Self {
                users: MockUserRepository::new(),
                hasher,
                tokens: MockTokenService::new(),
                throttle,
            }
        }

        fn service(self) -> AccountService {
            AccountService::new(
                Arc::new(self.users),
                Arc::new(self.hasher),
                Arc::new(self.tokens),
                Arc::new(self.throttle),
            )
        }
    }

    fn session() -> SessionToken {
        SessionToken { token: "tok".into(), expires_at: chrono::Utc::now() }
    }

    #[tokio::test]
    async fn first_account_becomes_admin() {
        let mut m = Mocks::new();
        m.users.expect_find_user_by_username().returning(|_| Ok(None));
        m.users.expect_count_users().returning(|| Ok(0));
        m.users
            .expect_insert_user()
            .withf(|u| u.roles.contains(&Role::Admin) && u.password_hash == "hashed:Secret#123")
            .times(1)
            .returning(|_| Ok(()));

        let profile = m.service().register("alice", "Secret#123").await.unwrap();
        assert_eq!(profile.roles, vec![Role::Admin, Role::Student]);
    }

    #[tokio::test]
    async fn later_accounts_are_students() {
        let mut m = Mocks::new();
        m.users.expect_find_user_by_username().returning(|_| Ok(None));
        m.users.expect_count_users().returning(|| Ok(3));
        m.users.expect_insert_user().returning(|_| Ok(()));

        let profile = m.service().register("bob_b", "Secret#123").await.unwrap();
        assert_eq!(profile.roles, vec![Role::Student]);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let mut m = Mocks::new();
        m.users
            .expect_find_user_by_username()
            .returning(|_| Ok(Some(user("alice", &[Role::Student]))));
        m.users.expect_insert_user().never();

        let err = m.service().register("ALICE", "Secret#123").await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_storage() {
        let mut m = Mocks::new();
        m.users.expect_find_user_by_username().never();

        let svc = m.service();
        assert!(matches!(
            svc.register("9lives", "Secret#123").await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            svc.register("ninelives", "weak").await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn wrong_password_records_failure() {
        let mut m = Mocks::new();
        let mut alice = user("alice", &[Role::Student]);
        alice.password_hash = "hashed:Secret#123".into();
        m.users
            .expect_find_user_by_username()
            .returning(move |_| Ok(Some(alice.clone())));
        m.throttle.expect_record_failure().times(1).return_const(());
        m.tokens.expect_issue().never();

        let err = m.service().login("alice", "Wrong#123").await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn unknown_username_still_verifies_a_hash() {
        let mut m = Mocks::new();
        m.hasher = MockPasswordHasher::new();
        m.hasher
            .expect_hash()
            .times(1)
            .returning(|p| Ok(format!("hashed:{p}")));
        m.hasher
            .expect_verify()
            .times(2)
            .returning(|p, h| h == format!("hashed:{p}"));
        m.users.expect_find_user_by_username().returning(|_| Ok(None));
        m.throttle.expect_record_failure().times(2).return_const(());
        m.tokens.expect_issue().never();

        let service = m.service();
        for _ in 0..2 {
            let err = service.login("ghost", "classboard-timing-dummy").await.unwrap_err();
            assert!(matches!(err, DomainError::Unauthorized(_)));
        }
    }

        #[tokio::test]
    async fn ban_prevents_login() {
        let mut m = Mocks::new();
        let mut alice = user("alice", &[Role::Student]);
        alice.password_hash = "hashed:Secret#123".into();
        alice.ban = Some(ban("cheating", None));
        m.users
            .expect_find_user_by_username()
            .returning(move |_| Ok(Some(alice.clone())));
        m.throttle.expect_clear().return_const(());
        m.tokens.expect_issue().never();

        let err = m.service().login("alice", "Secret#123").await.unwrap_err();
        match err {
            DomainError::Banned { reason } => assert_eq!(reason, "cheating"),
            other => panic!("expected ban, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_issues_session() {
        let mut m = Mocks::new();
        let mut alice = user("alice", &[Role::Student]);
        alice.password_hash = "hashed:Secret#123".into();
        m.users
            .expect_find_user_by_username()
            .returning(move |_| Ok(Some(alice.clone())));
        m.throttle.expect_clear().times(1).return_const(());
        m.tokens.expect_issue().returning(|_| Ok(session()));

        let outcome = m.service().login("alice", "Secret#123").await.unwrap();
        assert_eq!(outcome.session.token, "tok");
        assert_eq!(outcome.user.username, "alice");
    }

    #[tokio::test]
    async fn authenticate_rejects_banned_session() {
        let mut m = Mocks::new();
        let mut alice = user("alice", &[Role::Student]);
        alice.ban = Some(ban("spam", None));
        let id = alice.id;
        m.tokens.expect_verify().returning(move |_| Ok(id));
        m.users.expect_find_user().returning(move |_| Ok(Some(alice.clone())));

        let err = m.service().authenticate("tok").await.unwrap_err();
        assert!(matches!(err, DomainError::Banned { .. }));
    }

    #[tokio::test]
    async fn admin_cannot_drop_own_admin_role() {
        let m = Mocks::new();
        let admin = user("root", &[Role::Admin]);
        let err = m.service().revoke_role(&admin, admin.id, Role::Admin).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn last_role_cannot_be_revoked() {
        let mut m = Mocks::new();
        let admin = user("root", &[Role::Admin]);
        let student = user("alice", &[Role::Student]);
        let id = student.id;
        m.users.expect_find_user().returning(move |_| Ok(Some(student.clone())));
        m.users.expect_replace_roles().never();

        let err = m.service().revoke_role(&admin, id, Role::Student).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn grant_role_requires_admin() {
        let m = Mocks::new();
        let staff = user("staffer", &[Role::Staff]);
        let err = m
            .service()
            .grant_role(&staff, uuid::Uuid::now_v7(), Role::Reviewer)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn grant_role_persists_new_set() {
        let mut m = Mocks::new();
        let admin = user("root", &[Role::Admin]);
        let student = user("alice", &[Role::Student]);
        let id = student.id;
        m.users.expect_find_user().returning(move |_| Ok(Some(student.clone())));
        m.users
            .expect_replace_roles()
            .withf(|_, roles| roles.contains(&Role::Reviewer) && roles.contains(&Role::Student))
            .times(1)
            .returning(|_, _| Ok(()));

        let profile = m.service().grant_role(&admin, id, Role::Reviewer).await.unwrap();
        assert_eq!(profile.roles, vec![Role::Reviewer, Role::Student]);
    }
}
