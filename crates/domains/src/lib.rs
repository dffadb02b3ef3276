//! classboard/crates/domains/src/lib.rs
//!
//! The central domain types and interface definitions for Classboard.

pub mod errors;
pub mod models;
pub mod permissions;
pub mod ports;
pub mod validation;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use permissions::Permission;
pub use ports::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    #[test]
    fn test_vote_toggle_rule() {
        assert_eq!(VoteOutcome::decide(None, VoteDirection::Up), VoteOutcome::Recorded);
        assert_eq!(
            VoteOutcome::decide(Some(VoteDirection::Up), VoteDirection::Up),
            VoteOutcome::Removed
        );
        assert_eq!(
            VoteOutcome::decide(Some(VoteDirection::Down), VoteDirection::Up),
            VoteOutcome::Switched
        );
    }

    #[test]
    fn test_chat_pair_is_canonical() {
        let (x, y) = (Uuid::now_v7(), Uuid::now_v7());
        let one = Chat::between(x, y);
        let two = Chat::between(y, x);
        assert_eq!((one.user_a, one.user_b), (two.user_a, two.user_b));
        assert_eq!(one.other(x), y);
        assert!(one.includes(y));
    }

    #[test]
    fn test_expired_ban_is_inactive() {
        let mut user = User::new("alice", "hash", BTreeSet::from([Role::Student]));
        user.ban = Some(Ban {
            reason: "spam".into(),
            issued_by: Uuid::now_v7(),
            created_at: chrono::Utc::now() - chrono::Duration::hours(2),
            expires_at: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
        });
        assert!(user.active_ban().is_none());
        assert!(!UserProfile::from(&user).banned);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Reviewer".parse::<Role>(), Ok(Role::Reviewer));
        assert!("janitor".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Staff).unwrap(), "\"staff\"");
    }
}
