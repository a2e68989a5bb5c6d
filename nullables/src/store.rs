//! Nullable store: thread-safe in-memory poll storage for testing.

use foul_store::poll::{Finalization, PollStore};
use foul_store::StoreError;
use foul_types::{LeaderboardEntry, MemberId, Poll, PollKey, PollOutcome, Timestamp, VoteTally};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct Tables {
    polls: BTreeMap<PollKey, Poll>,
    /// Votes per poll, keyed by voter so upserts overwrite.
    votes: HashMap<PollKey, BTreeMap<MemberId, bool>>,
}

/// An in-memory poll store for testing.
///
/// All tables sit behind one mutex, so every operation is atomic the same
/// way an LMDB write transaction is. Thread-safe for use with tokio's
/// multi-threaded runtime.
pub struct NullStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
    fail_finalize: AtomicBool,
    write_delay_ms: AtomicU64,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            unavailable: AtomicBool::new(false),
            fail_finalize: AtomicBool::new(false),
            write_delay_ms: AtomicU64::new(0),
        }
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make only `finalize_poll` fail, leaving reads and votes working.
    pub fn set_fail_finalize(&self, fail: bool) {
        self.fail_finalize.store(fail, Ordering::SeqCst);
    }

    /// Make `create_poll` and `finalize_poll` sleep before committing.
    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn stall(&self) {
        let ms = self.write_delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("null store switched off".into()));
        }
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("null store mutex poisoned".into()))
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PollStore for NullStore {
    fn create_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        self.stall();
        let mut tables = self.lock()?;
        if tables.polls.contains_key(&poll.key) {
            return Err(StoreError::Duplicate(poll.key.to_string()));
        }
        tables.polls.insert(poll.key.clone(), poll.clone());
        Ok(())
    }

    fn get_poll(&self, key: &PollKey) -> Result<Option<Poll>, StoreError> {
        Ok(self.lock()?.polls.get(key).cloned())
    }

    fn record_vote(
        &self,
        key: &PollKey,
        voter: &MemberId,
        in_favor: bool,
    ) -> Result<(), StoreError> {
        self.lock()?
            .votes
            .entry(key.clone())
            .or_default()
            .insert(voter.clone(), in_favor);
        Ok(())
    }

    fn select_expired_unresolved(&self, now: Timestamp) -> Result<Vec<Poll>, StoreError> {
        let tables = self.lock()?;
        let mut due: Vec<Poll> = tables
            .polls
            .values()
            .filter(|p| p.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.expiry.cmp(&b.expiry).then_with(|| a.key.cmp(&b.key)));
        Ok(due)
    }

    fn tally_votes(&self, key: &PollKey) -> Result<VoteTally, StoreError> {
        let tables = self.lock()?;
        let mut tally = VoteTally::default();
        if let Some(votes) = tables.votes.get(key) {
            for (voter, in_favor) in votes {
                if *in_favor {
                    tally.votes_for.push(voter.clone());
                } else {
                    tally.votes_against.push(voter.clone());
                }
            }
        }
        Ok(tally)
    }

    fn gainers(&self, key: &PollKey) -> Result<Vec<MemberId>, StoreError> {
        Ok(self
            .lock()?
            .polls
            .get(key)
            .map(|p| p.gainer_ids.clone())
            .unwrap_or_default())
    }

    fn finalize_poll(
        &self,
        key: &PollKey,
        outcome: PollOutcome,
    ) -> Result<Finalization, StoreError> {
        if self.fail_finalize.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("finalize switched off".into()));
        }
        if !outcome.is_terminal() {
            return Err(StoreError::Backend(format!(
                "refusing to finalize {key} as pending"
            )));
        }
        self.stall();
        let mut tables = self.lock()?;
        let poll = tables
            .polls
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        if poll.outcome.is_terminal() {
            return Ok(Finalization::AlreadyFinal(poll.outcome));
        }
        poll.outcome = outcome;
        Ok(Finalization::Applied(outcome))
    }

    fn sum_points_by_gainer(&self, year: i32) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let tables = self.lock()?;
        let mut totals: BTreeMap<MemberId, i128> = BTreeMap::new();
        for poll in tables.polls.values() {
            if poll.outcome == PollOutcome::Passed && poll.expiry.year() == year {
                for gainer in &poll.gainer_ids {
                    *totals.entry(gainer.clone()).or_insert(0) += i128::from(poll.points);
                }
            }
        }
        let mut entries: Vec<LeaderboardEntry> = totals
            .into_iter()
            .map(|(member, total)| LeaderboardEntry::clamped(member, total))
            .collect();
        entries.sort_by(LeaderboardEntry::rank_cmp);
        Ok(entries)
    }

    fn poll_count(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.polls.len() as u64)
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.lock()? = Tables::default();
        Ok(())
    }
}
