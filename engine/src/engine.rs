//! Poll engine: turns requests into polls, records votes, and resolves
//! expired polls exactly once.

use std::sync::Arc;

use foul_store::{Finalization, PollStore};
use foul_types::{
    Clock, EvaluatedPoll, LeaderboardEntry, MemberId, MessageId, Poll, PollDraft, PollKey,
    Timestamp,
};

use crate::error::EngineError;
use crate::request::PollRequest;

/// 16 hours.
pub const DEFAULT_POLL_DURATION_SECS: u64 = 16 * 60 * 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a poll accepts votes before the sweep resolves it.
    pub poll_duration_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_duration_secs: DEFAULT_POLL_DURATION_SECS,
        }
    }
}

/// Synchronous poll engine over a [`PollStore`].
///
/// Every method is a short store transaction; async callers run them on the
/// blocking pool.
pub struct PollEngine<S: PollStore, C: Clock> {
    store: Arc<S>,
    clock: C,
    config: EngineConfig,
}

impl<S: PollStore, C: Clock> PollEngine<S, C> {
    pub fn new(store: Arc<S>, clock: C, config: EngineConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Calendar year (UTC) of the engine clock, the default leaderboard year.
    pub fn current_year(&self) -> i32 {
        self.now().year()
    }

    /// Validate a request and compute its expiry. Nothing is persisted.
    pub fn draft(&self, request: PollRequest) -> Result<PollDraft, EngineError> {
        let expiry = self.now().plus_secs(self.config.poll_duration_secs);
        Ok(request.into_draft(expiry)?)
    }

    /// Persist a drafted poll under the message it was posted as.
    ///
    /// The poll, its gainers and its expiry index entry are written in one
    /// store transaction.
    pub fn create_poll(&self, draft: PollDraft, message_id: MessageId) -> Result<Poll, EngineError> {
        let poll = draft.into_poll(message_id);
        self.store.create_poll(&poll)?;
        tracing::info!(
            poll = %poll.key,
            creator = %poll.creator_id,
            points = poll.points,
            gainers = poll.gainer_ids.len(),
            expiry = %poll.expiry,
            "poll created"
        );
        Ok(poll)
    }

    /// [`draft`](Self::draft) followed by [`create_poll`](Self::create_poll).
    pub fn create_poll_now(
        &self,
        request: PollRequest,
        message_id: MessageId,
    ) -> Result<Poll, EngineError> {
        let draft = self.draft(request)?;
        self.create_poll(draft, message_id)
    }

    /// Upsert a member's vote. The last vote per member wins.
    ///
    /// Votes are accepted regardless of poll state; a vote arriving after
    /// finalization is stored but never counted.
    pub fn record_vote(
        &self,
        key: &PollKey,
        voter: &MemberId,
        in_favor: bool,
    ) -> Result<(), EngineError> {
        self.store.record_vote(key, voter, in_favor)?;
        tracing::debug!(poll = %key, voter = %voter, in_favor, "vote recorded");
        Ok(())
    }

    /// Resolve every pending poll whose expiry has passed.
    ///
    /// Returns only the polls this call finalized. A poll whose evaluation
    /// fails stays pending and is picked up by the next sweep.
    pub fn evaluate_expired_polls(&self) -> Result<Vec<EvaluatedPoll>, EngineError> {
        let now = self.now();
        let due = self.store.select_expired_unresolved(now)?;
        let mut evaluated = Vec::with_capacity(due.len());

        for poll in due {
            match self.evaluate_poll(poll) {
                Ok(Some(done)) => evaluated.push(done),
                Ok(None) => {}
                Err((key, e)) => {
                    tracing::warn!(poll = %key, error = %e, "poll evaluation failed, will retry");
                }
            }
        }

        if !evaluated.is_empty() {
            tracing::info!(count = evaluated.len(), "expired polls resolved");
        }
        Ok(evaluated)
    }

    fn evaluate_poll(&self, mut poll: Poll) -> Result<Option<EvaluatedPoll>, (PollKey, EngineError)> {
        let tally = self
            .store
            .tally_votes(&poll.key)
            .map_err(|e| (poll.key.clone(), e.into()))?;
        let outcome = tally.outcome();

        match self.store.finalize_poll(&poll.key, outcome) {
            Ok(Finalization::Applied(applied)) => {
                poll.outcome = applied;
                tracing::info!(
                    poll = %poll.key,
                    outcome = applied.as_str(),
                    votes_for = tally.votes_for.len(),
                    votes_against = tally.votes_against.len(),
                    "poll finalized"
                );
                Ok(Some(EvaluatedPoll {
                    poll,
                    votes_for: tally.votes_for,
                    votes_against: tally.votes_against,
                }))
            }
            Ok(Finalization::AlreadyFinal(existing)) => {
                tracing::debug!(poll = %poll.key, outcome = existing.as_str(), "poll already final");
                Ok(None)
            }
            Err(e) => Err((poll.key, e.into())),
        }
    }

    /// Point totals for `year`, highest first.
    pub fn leaderboard(&self, year: i32) -> Result<Vec<LeaderboardEntry>, EngineError> {
        Ok(self.store.sum_points_by_gainer(year)?)
    }

    /// The first `n` rows of [`leaderboard`](Self::leaderboard).
    pub fn leaderboard_top(&self, year: i32, n: usize) -> Result<Vec<LeaderboardEntry>, EngineError> {
        let mut rows = self.leaderboard(year)?;
        rows.truncate(n);
        Ok(rows)
    }
}
