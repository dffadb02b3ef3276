//! # Permissions
//!
//! The role matrix. A user may perform an action when any of their roles
//! grants the matching [`Permission`]. Ownership rules (editing your own
//! question, marking the answer on your own question) live in the services.

use crate::errors::{DomainError, Result};
use crate::models::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    AskQuestion,
    Answer,
    Vote,
    Message,
    ManageTrust,
    WriteReview,
    /// Mark the correct answer on any question, not just your own
    MarkCorrect,
    FlagSensitive,
    ViewSensitive,
    DeleteAnyContent,
    BanUsers,
    ManageRoles,
    DeleteUsers,
    ListUsers,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::AskQuestion => "ask questions",
            Permission::Answer => "answer questions",
            Permission::Vote => "vote",
            Permission::Message => "send messages",
            Permission::ManageTrust => "manage trusted reviewers",
            Permission::WriteReview => "write reviews",
            Permission::MarkCorrect => "mark correct answers",
            Permission::FlagSensitive => "flag sensitive content",
            Permission::ViewSensitive => "view sensitive content",
            Permission::DeleteAnyContent => "delete other users' content",
            Permission::BanUsers => "ban users",
            Permission::ManageRoles => "manage roles",
            Permission::DeleteUsers => "delete users",
            Permission::ListUsers => "list users",
        }
    }
}

impl Role {
    pub fn grants(self, permission: Permission) -> bool {
        use Permission::*;
        match permission {
            AskQuestion | Answer | Vote | Message | ManageTrust => true,
            WriteReview => matches!(self, Role::Admin | Role::Reviewer),
            MarkCorrect => matches!(self, Role::Admin | Role::Instructor),
            FlagSensitive | ViewSensitive | DeleteAnyContent => {
                matches!(self, Role::Admin | Role::Instructor | Role::Staff)
            }
            BanUsers => matches!(self, Role::Admin | Role::Staff),
            ManageRoles | DeleteUsers | ListUsers => self == Role::Admin,
        }
    }
}

impl User {
    pub fn can(&self, permission: Permission) -> bool {
        self.roles.iter().any(|r| r.grants(permission))
    }

    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(DomainError::forbidden(format!(
                "{} may not {}",
                self.username,
                permission.as_str()
            )))
        }
    }
}
