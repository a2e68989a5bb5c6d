//! Binary key layouts shared by the poll databases.
//!
//! - `polls`:   `poll_key` → bincode `PollRecord`
//! - `gainers`: `poll_key ++ member` → `ordinal_be_u32`
//! - `votes`:   `poll_key ++ voter` → `[1]` (for) or `[0]` (against)
//! - `expiry`:  `expiry_be_u64 ++ poll_key` → empty, pending polls only.
//!   Big-endian u64 sorts lexicographically by time, so the sweep is a
//!   single range scan.
//!
//! `poll_key` is [`PollKey::encode`], which is prefix-free across polls.

use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, RoTxn};

use foul_types::{KeyTooLong, MemberId, PollKey, Timestamp};

use crate::LmdbError;

/// `poll_key ++ member`, used by the gainer and vote databases.
pub fn member_key(poll: &PollKey, member: &MemberId) -> Result<Vec<u8>, KeyTooLong> {
    if !member.fits_key() {
        return Err(KeyTooLong {
            field: "member",
            len: member.as_str().len(),
        });
    }
    let mut key = poll.encode()?;
    key.extend_from_slice(member.as_str().as_bytes());
    Ok(key)
}

/// `expiry_be_u64 ++ poll_key` for the expiry index.
pub fn expiry_key(expiry: Timestamp, poll: &PollKey) -> Result<Vec<u8>, KeyTooLong> {
    let encoded = poll.encode()?;
    let mut key = Vec::with_capacity(8 + encoded.len());
    key.extend_from_slice(&expiry.as_secs().to_be_bytes());
    key.extend_from_slice(&encoded);
    Ok(key)
}

/// Split an expiry-index key back into its parts.
pub fn parse_expiry_key(key: &[u8]) -> Option<(Timestamp, PollKey)> {
    let secs: [u8; 8] = key.get(..8)?.try_into().ok()?;
    let (poll, used) = PollKey::decode(&key[8..])?;
    if 8 + used != key.len() {
        return None;
    }
    Some((Timestamp::new(u64::from_be_bytes(secs)), poll))
}

/// The member suffix of a `poll_key ++ member` key.
pub fn member_suffix(key: &[u8], prefix_len: usize) -> Result<MemberId, LmdbError> {
    let raw = key
        .get(prefix_len..)
        .ok_or_else(|| LmdbError::Serialization("member key shorter than prefix".into()))?;
    let s = std::str::from_utf8(raw)
        .map_err(|e| LmdbError::Serialization(format!("member id is not utf-8: {e}")))?;
    Ok(MemberId::new(s))
}

/// Smallest byte string greater than every string starting with `prefix`,
/// or `None` when no such bound exists (all bytes `0xFF`).
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

/// Collect every `(key, value)` pair whose key starts with `prefix`.
pub fn scan_prefix(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
    prefix: &[u8],
) -> Result<Vec<(Vec<u8>, Vec<u8>)>, LmdbError> {
    let upper = prefix_upper_bound(prefix);
    let bounds: (Bound<&[u8]>, Bound<&[u8]>) = match upper.as_deref() {
        Some(u) => (Bound::Included(prefix), Bound::Excluded(u)),
        None => (Bound::Included(prefix), Bound::Unbounded),
    };
    let mut out = Vec::new();
    for result in db.range(txn, &bounds)? {
        let (key, val) = result?;
        out.push((key.to_vec(), val.to_vec()));
    }
    Ok(out)
}
