use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of row a vote points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Question,
    Answer,
    Review,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Question => "question",
            TargetKind::Answer => "answer",
            TargetKind::Review => "review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "question" => Some(TargetKind::Question),
            "answer" => Some(TargetKind::Answer),
            "review" => Some(TargetKind::Review),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum VoteTarget {
    Question(Uuid),
    Answer(Uuid),
    Review(Uuid),
}

impl VoteTarget {
    pub fn kind(self) -> TargetKind {
        match self {
            VoteTarget::Question(_) => TargetKind::Question,
            VoteTarget::Answer(_) => TargetKind::Answer,
            VoteTarget::Review(_) => TargetKind::Review,
        }
    }

    pub fn id(self) -> Uuid {
        match self {
            VoteTarget::Question(id) | VoteTarget::Answer(id) | VoteTarget::Review(id) => id,
        }
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.id())
    }
}

/// Up/down on questions and answers; helpful/not-helpful on reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(VoteDirection::Up),
            "down" => Some(VoteDirection::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub user_id: Uuid,
    pub target: VoteTarget,
    pub direction: VoteDirection,
    pub created_at: DateTime<Utc>,
}

/// What a cast did to the voter's existing vote on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteOutcome {
    /// No prior vote; this one was stored
    Recorded,
    /// Same direction as the prior vote; the vote was withdrawn
    Removed,
    /// Opposite direction; the prior vote was flipped
    Switched,
}

impl VoteOutcome {
    /// The toggle rule: a repeated vote withdraws, an opposite vote flips.
    pub fn decide(existing: Option<VoteDirection>, cast: VoteDirection) -> Self {
        match existing {
            None => VoteOutcome::Recorded,
            Some(prev) if prev == cast => VoteOutcome::Removed,
            Some(_) => VoteOutcome::Switched,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub up: i64,
    pub down: i64,
}

impl VoteTally {
    pub fn score(&self) -> i64 {
        self.up - self.down
    }
}
