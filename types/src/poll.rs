//! Polls and their lifecycle state.

use serde::{Deserialize, Serialize};

use crate::id::{ChannelId, MemberId, MessageId, PollKey};
use crate::time::Timestamp;

/// Resolution state of a poll.
///
/// `Pending` is the only non-terminal state. Once a poll is `Passed` or
/// `Failed` it never changes again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollOutcome {
    /// Still collecting votes (or expired but not yet swept).
    #[default]
    Pending,
    /// Strictly more votes for than against; gainers receive the points.
    Passed,
    /// Tied or more votes against.
    Failed,
}

impl PollOutcome {
    /// Outcome of a tally: strict majority of cast votes passes, ties fail.
    pub fn from_counts(votes_for: usize, votes_against: usize) -> Self {
        if votes_for > votes_against {
            Self::Passed
        } else {
            Self::Failed
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

/// A validated poll that has not been posted yet, so it has no message id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDraft {
    pub channel_id: ChannelId,
    pub creator_id: MemberId,
    pub points: i64,
    pub reason: String,
    /// Deduplicated, in first-mention order. Never empty.
    pub gainer_ids: Vec<MemberId>,
    pub expiry: Timestamp,
}

impl PollDraft {
    /// Bind the draft to the message it was posted as.
    pub fn into_poll(self, message_id: MessageId) -> Poll {
        Poll {
            key: PollKey {
                channel_id: self.channel_id,
                message_id,
            },
            creator_id: self.creator_id,
            points: self.points,
            reason: self.reason,
            gainer_ids: self.gainer_ids,
            expiry: self.expiry,
            outcome: PollOutcome::Pending,
        }
    }
}

/// A persisted poll.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub key: PollKey,
    pub creator_id: MemberId,
    pub points: i64,
    pub reason: String,
    pub gainer_ids: Vec<MemberId>,
    pub expiry: Timestamp,
    pub outcome: PollOutcome,
}

impl Poll {
    /// Whether the sweep running at `now` should evaluate this poll.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.outcome == PollOutcome::Pending && self.expiry <= now
    }
}

/// The voters on one poll, split by side, read from a single store snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub votes_for: Vec<MemberId>,
    pub votes_against: Vec<MemberId>,
}

impl VoteTally {
    pub fn outcome(&self) -> PollOutcome {
        PollOutcome::from_counts(self.votes_for.len(), self.votes_against.len())
    }
}

/// A poll the sweep has just finalized, with everything needed to announce it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatedPoll {
    pub poll: Poll,
    pub votes_for: Vec<MemberId>,
    pub votes_against: Vec<MemberId>,
}

impl EvaluatedPoll {
    pub fn passed(&self) -> bool {
        self.poll.outcome.passed()
    }
}
