//! # TrustService
//!
//! Each user keeps a personal list of reviewers they trust. Listings of
//! questions and reviews can then be narrowed to that list.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    DomainError, Permission, Result, Role, TrustRepository, TrustedReviewer, User, UserProfile,
    UserRepository,
};
use tracing::{info, instrument};

pub struct TrustService {
    trust: Arc<dyn TrustRepository>,
    users: Arc<dyn UserRepository>,
}

impl TrustService {
    pub fn new(trust: Arc<dyn TrustRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { trust, users }
    }

    #[instrument(skip_all, fields(actor = %actor.id, reviewer = reviewer))]
    pub async fn trust(&self, actor: &User, reviewer: &str) -> Result<UserProfile> {
        actor.require(Permission::ManageTrust)?;
        let target = self.find_by_name(reviewer).await?;

        if target.id == actor.id {
            return Err(DomainError::InvalidRequest("you cannot trust yourself".into()));
        }
        if !target.has_role(Role::Reviewer) {
            return Err(DomainError::InvalidRequest(format!("{} is not a reviewer", target.username)));
        }

        let link = TrustedReviewer {
            truster_id: actor.id,
            trusted_id: target.id,
            created_at: Utc::now(),
        };
        self.trust.add_trust(&link).await?;
        info!("reviewer trusted");
        Ok(UserProfile::from(&target))
    }

    #[instrument(skip_all, fields(actor = %actor.id, reviewer = reviewer))]
    pub async fn untrust(&self, actor: &User, reviewer: &str) -> Result<()> {
        actor.require(Permission::ManageTrust)?;
        let target = self.find_by_name(reviewer).await?;
        if !self.trust.remove_trust(actor.id, target.id).await? {
            return Err(DomainError::not_found("trusted reviewer", reviewer));
        }
        info!("reviewer untrusted");
        Ok(())
    }

    pub async fn list_trusted(&self, actor: &User) -> Result<Vec<UserProfile>> {
        let trusted = self.trust.list_trusted(actor.id).await?;
        Ok(trusted.iter().map(UserProfile::from).collect())
    }

    async fn find_by_name(&self, username: &str) -> Result<User> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("user", username))
    }
}
