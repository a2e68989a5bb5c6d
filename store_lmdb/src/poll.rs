//! LMDB implementation of PollStore.
//!
//! Every mutating operation is one LMDB write transaction. LMDB allows a
//! single writer per environment, which serializes vote upserts against
//! finalization. Reads use snapshot read transactions.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};
use serde::{Deserialize, Serialize};

use foul_store::poll::{Finalization, PollStore};
use foul_store::StoreError;
use foul_types::{
    LeaderboardEntry, MemberId, Poll, PollKey, PollOutcome, Timestamp, VoteTally,
};

use crate::keys::{expiry_key, member_key, member_suffix, parse_expiry_key, scan_prefix};
use crate::LmdbError;

const VOTE_FOR: &[u8] = &[1];
const VOTE_AGAINST: &[u8] = &[0];

/// Value stored in `polls_db`. Identity and gainers live in the key and in
/// `gainers_db` respectively.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct PollRecord {
    creator_id: MemberId,
    points: i64,
    reason: String,
    expiry: Timestamp,
    outcome: PollOutcome,
}

impl PollRecord {
    fn from_poll(poll: &Poll) -> Self {
        Self {
            creator_id: poll.creator_id.clone(),
            points: poll.points,
            reason: poll.reason.clone(),
            expiry: poll.expiry,
            outcome: poll.outcome,
        }
    }

    fn into_poll(self, key: PollKey, gainer_ids: Vec<MemberId>) -> Poll {
        Poll {
            key,
            creator_id: self.creator_id,
            points: self.points,
            reason: self.reason,
            gainer_ids,
            expiry: self.expiry,
            outcome: self.outcome,
        }
    }
}

#[derive(Clone)]
pub struct LmdbPollStore {
    pub(crate) env: Arc<Env>,
    pub(crate) polls_db: Database<Bytes, Bytes>,
    pub(crate) gainers_db: Database<Bytes, Bytes>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
    pub(crate) expiry_db: Database<Bytes, Bytes>,
}

impl LmdbPollStore {
    fn read_record(&self, txn: &RoTxn, key: &[u8]) -> Result<Option<PollRecord>, LmdbError> {
        match self.polls_db.get(txn, key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    fn read_gainers(&self, txn: &RoTxn, poll: &PollKey) -> Result<Vec<MemberId>, LmdbError> {
        let prefix = poll.encode()?;
        let mut rows = Vec::new();
        for (key, val) in scan_prefix(&self.gainers_db, txn, &prefix)? {
            let ordinal: [u8; 4] = val.as_slice().try_into().map_err(|_| {
                LmdbError::Serialization("gainer ordinal has unexpected length".into())
            })?;
            rows.push((u32::from_be_bytes(ordinal), member_suffix(&key, prefix.len())?));
        }
        rows.sort_by_key(|(ordinal, _)| *ordinal);
        Ok(rows.into_iter().map(|(_, member)| member).collect())
    }

    fn read_tally(&self, txn: &RoTxn, poll: &PollKey) -> Result<VoteTally, LmdbError> {
        let prefix = poll.encode()?;
        let mut tally = VoteTally::default();
        for (key, val) in scan_prefix(&self.votes_db, txn, &prefix)? {
            let voter = member_suffix(&key, prefix.len())?;
            if val.as_slice() == VOTE_FOR {
                tally.votes_for.push(voter);
            } else {
                tally.votes_against.push(voter);
            }
        }
        Ok(tally)
    }
}

impl PollStore for LmdbPollStore {
    fn create_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        let key = poll.key.encode()?;
        let record = bincode::serialize(&PollRecord::from_poll(poll)).map_err(LmdbError::from)?;

        // Dropping `wtxn` on any early return aborts the whole insert.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .polls_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(poll.key.to_string()));
        }
        self.polls_db
            .put(&mut wtxn, &key, &record)
            .map_err(LmdbError::from)?;
        for (ordinal, gainer) in poll.gainer_ids.iter().enumerate() {
            self.gainers_db
                .put(
                    &mut wtxn,
                    &member_key(&poll.key, gainer)?,
                    &(ordinal as u32).to_be_bytes(),
                )
                .map_err(LmdbError::from)?;
        }
        if poll.outcome == PollOutcome::Pending {
            self.expiry_db
                .put(&mut wtxn, &expiry_key(poll.expiry, &poll.key)?, &[])
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_poll(&self, key: &PollKey) -> Result<Option<Poll>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let Some(record) = self.read_record(&rtxn, &key.encode()?)? else {
            return Ok(None);
        };
        let gainers = self.read_gainers(&rtxn, key)?;
        Ok(Some(record.into_poll(key.clone(), gainers)))
    }

    fn record_vote(
        &self,
        key: &PollKey,
        voter: &MemberId,
        in_favor: bool,
    ) -> Result<(), StoreError> {
        let value = if in_favor { VOTE_FOR } else { VOTE_AGAINST };
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.votes_db
            .put(&mut wtxn, &member_key(key, voter)?, value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn select_expired_unresolved(&self, now: Timestamp) -> Result<Vec<Poll>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let upper = now.as_secs().checked_add(1).map(u64::to_be_bytes);
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = match upper.as_ref() {
            Some(u) => (Bound::Unbounded, Bound::Excluded(u.as_slice())),
            None => (Bound::Unbounded, Bound::Unbounded),
        };

        let mut due = Vec::new();
        for result in self
            .expiry_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?
        {
            let (index_key, _) = result.map_err(LmdbError::from)?;
            let (_, poll_key) = parse_expiry_key(index_key).ok_or_else(|| {
                StoreError::Corruption("malformed expiry index key".to_string())
            })?;
            due.push(poll_key);
        }

        let mut polls = Vec::with_capacity(due.len());
        for poll_key in due {
            match self.read_record(&rtxn, &poll_key.encode()?)? {
                Some(record) if record.outcome == PollOutcome::Pending => {
                    let gainers = self.read_gainers(&rtxn, &poll_key)?;
                    polls.push(record.into_poll(poll_key, gainers));
                }
                Some(_) => {
                    tracing::warn!(poll = %poll_key, "expiry index points at a resolved poll");
                }
                None => {
                    tracing::warn!(poll = %poll_key, "expiry index points at a missing poll");
                }
            }
        }
        Ok(polls)
    }

    fn tally_votes(&self, key: &PollKey) -> Result<VoteTally, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.read_tally(&rtxn, key)?)
    }

    fn gainers(&self, key: &PollKey) -> Result<Vec<MemberId>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.read_gainers(&rtxn, key)?)
    }

    fn finalize_poll(
        &self,
        key: &PollKey,
        outcome: PollOutcome,
    ) -> Result<Finalization, StoreError> {
        if !outcome.is_terminal() {
            return Err(StoreError::Backend(format!(
                "refusing to finalize {key} as pending"
            )));
        }
        let encoded = key.encode()?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut record = self
            .read_record(&wtxn, &encoded)?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        if record.outcome.is_terminal() {
            // Read-only path; the transaction is aborted on drop.
            return Ok(Finalization::AlreadyFinal(record.outcome));
        }

        record.outcome = outcome;
        let bytes = bincode::serialize(&record).map_err(LmdbError::from)?;
        self.polls_db
            .put(&mut wtxn, &encoded, &bytes)
            .map_err(LmdbError::from)?;
        self.expiry_db
            .delete(&mut wtxn, &expiry_key(record.expiry, key)?)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(Finalization::Applied(outcome))
    }

    fn sum_points_by_gainer(&self, year: i32) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;

        let mut passed = Vec::new();
        for result in self.polls_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, val) = result.map_err(LmdbError::from)?;
            let record: PollRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
            if record.outcome == PollOutcome::Passed && record.expiry.year() == year {
                let (poll_key, _) = PollKey::decode(key).ok_or_else(|| {
                    StoreError::Corruption("malformed poll key".to_string())
                })?;
                passed.push((poll_key, record.points));
            }
        }

        let mut totals: BTreeMap<MemberId, i128> = BTreeMap::new();
        for (poll_key, points) in passed {
            for gainer in self.read_gainers(&rtxn, &poll_key)? {
                *totals.entry(gainer).or_insert(0) += i128::from(points);
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
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.polls_db.len(&rtxn).map_err(LmdbError::from)?)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.polls_db.clear(&mut wtxn).map_err(LmdbError::from)?;
        self.gainers_db.clear(&mut wtxn).map_err(LmdbError::from)?;
        self.votes_db.clear(&mut wtxn).map_err(LmdbError::from)?;
        self.expiry_db.clear(&mut wtxn).map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::warn!("poll store cleared");
        Ok(())
    }
}
