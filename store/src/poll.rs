//! Poll, vote and leaderboard storage trait.

use foul_types::{LeaderboardEntry, MemberId, Poll, PollKey, PollOutcome, Timestamp, VoteTally};

use crate::StoreError;

/// Result of a conditional finalization write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finalization {
    /// This call moved the poll from `Pending` to the given outcome.
    Applied(PollOutcome),
    /// The poll was already terminal; nothing was written.
    AlreadyFinal(PollOutcome),
}

impl Finalization {
    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn outcome(&self) -> PollOutcome {
        match self {
            Self::Applied(o) | Self::AlreadyFinal(o) => *o,
        }
    }
}

/// Durable state for polls, gainers and votes.
///
/// Implementations must make each mutating call atomic and must serialize
/// conflicting writes: a vote upsert and a finalization on the same poll
/// never interleave partially.
pub trait PollStore: Send + Sync {
    /// Insert a poll together with its gainer rows. Either everything is
    /// written or nothing is. Fails with [`StoreError::Duplicate`] if a poll
    /// with the same key exists.
    fn create_poll(&self, poll: &Poll) -> Result<(), StoreError>;

    /// Fetch a poll (with its gainers) by key.
    fn get_poll(&self, key: &PollKey) -> Result<Option<Poll>, StoreError>;

    /// Upsert a vote; the last call for a (poll, voter) pair wins.
    fn record_vote(&self, key: &PollKey, voter: &MemberId, in_favor: bool)
        -> Result<(), StoreError>;

    /// All pending polls whose expiry is at or before `now`, oldest first.
    fn select_expired_unresolved(&self, now: Timestamp) -> Result<Vec<Poll>, StoreError>;

    /// Both sides of a poll's votes, read from one consistent snapshot.
    fn tally_votes(&self, key: &PollKey) -> Result<VoteTally, StoreError>;

    /// Voters currently in favor.
    fn votes_for(&self, key: &PollKey) -> Result<Vec<MemberId>, StoreError> {
        Ok(self.tally_votes(key)?.votes_for)
    }

    /// Voters currently against.
    fn votes_against(&self, key: &PollKey) -> Result<Vec<MemberId>, StoreError> {
        Ok(self.tally_votes(key)?.votes_against)
    }

    /// Gainers of a poll in the order they were named at creation.
    fn gainers(&self, key: &PollKey) -> Result<Vec<MemberId>, StoreError>;

    /// Write the terminal outcome if and only if the poll is still pending.
    ///
    /// Repeating the call is safe: a terminal poll is left untouched and
    /// reported as [`Finalization::AlreadyFinal`]. `outcome` must be terminal.
    fn finalize_poll(
        &self,
        key: &PollKey,
        outcome: PollOutcome,
    ) -> Result<Finalization, StoreError>;

    /// Per-gainer point totals over passed polls expiring in `year`,
    /// ordered by total descending then member id ascending.
    fn sum_points_by_gainer(&self, year: i32) -> Result<Vec<LeaderboardEntry>, StoreError>;

    /// Number of polls ever created (and not reset).
    fn poll_count(&self) -> Result<u64, StoreError>;

    /// Drop every poll, gainer and vote. Administrative use only.
    fn clear(&self) -> Result<(), StoreError>;
}
