//! Poll creation requests and their validation.

use std::collections::HashSet;

use foul_types::{ChannelId, MemberId, PollDraft, Timestamp};

use crate::error::InvalidInput;

/// What a member asked for when proposing a poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollRequest {
    pub channel_id: ChannelId,
    pub creator_id: MemberId,
    /// As named by the creator; may contain duplicates.
    pub gainer_ids: Vec<MemberId>,
    pub points: i64,
    pub reason: String,
}

impl PollRequest {
    /// Check the request and turn it into a draft expiring at `expiry`.
    pub fn into_draft(self, expiry: Timestamp) -> Result<PollDraft, InvalidInput> {
        if self.channel_id.is_empty() {
            return Err(InvalidInput::MissingField("channel"));
        }
        if self.creator_id.is_empty() {
            return Err(InvalidInput::MissingField("creator"));
        }
        if !self.channel_id.fits_key() {
            return Err(InvalidInput::IdTooLong("channel"));
        }
        let gainer_ids = dedup_gainers(self.gainer_ids);
        if gainer_ids.is_empty() {
            return Err(InvalidInput::NoGainers);
        }
        if !gainer_ids.iter().all(MemberId::fits_key) {
            return Err(InvalidInput::IdTooLong("gainer"));
        }
        if self.points == 0 {
            return Err(InvalidInput::InvalidPoints);
        }
        if self.reason.trim().is_empty() {
            return Err(InvalidInput::EmptyReason);
        }
        Ok(PollDraft {
            channel_id: self.channel_id,
            creator_id: self.creator_id,
            points: self.points,
            reason: self.reason,
            gainer_ids,
            expiry,
        })
    }
}

/// Drop repeated and empty gainer ids, keeping first-mention order.
pub fn dedup_gainers(gainers: Vec<MemberId>) -> Vec<MemberId> {
    let mut seen = HashSet::with_capacity(gainers.len());
    gainers
        .into_iter()
        .filter(|g| !g.is_empty() && seen.insert(g.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(gainers: &[&str], points: i64, reason: &str) -> PollRequest {
        PollRequest {
            channel_id: ChannelId::new("general"),
            creator_id: MemberId::new("creator"),
            gainer_ids: gainers.iter().map(|g| MemberId::new(*g)).collect(),
            points,
            reason: reason.into(),
        }
    }

    #[test]
    fn duplicates_collapse_in_first_mention_order() {
        let draft = request(&["u1", "u1", "u2", "u1"], 5, "demo")
            .into_draft(Timestamp::new(10))
            .unwrap();
        assert_eq!(draft.gainer_ids, vec![MemberId::new("u1"), MemberId::new("u2")]);
        assert_eq!(draft.expiry, Timestamp::new(10));
    }

    #[test]
    fn zero_points_rejected() {
        let err = request(&["u1"], 0, "demo").into_draft(Timestamp::EPOCH);
        assert_eq!(err, Err(InvalidInput::InvalidPoints));
    }

    #[test]
    fn negative_points_allowed() {
        let draft = request(&["u1"], -3, "lost gains").into_draft(Timestamp::EPOCH);
        assert_eq!(draft.unwrap().points, -3);
    }

    #[test]
    fn empty_gainers_rejected() {
        assert_eq!(
            request(&[], 5, "demo").into_draft(Timestamp::EPOCH),
            Err(InvalidInput::NoGainers)
        );
        assert_eq!(
            request(&[""], 5, "demo").into_draft(Timestamp::EPOCH),
            Err(InvalidInput::NoGainers)
        );
    }

    #[test]
    fn blank_reason_rejected() {
        assert_eq!(
            request(&["u1"], 5, "   ").into_draft(Timestamp::EPOCH),
            Err(InvalidInput::EmptyReason)
        );
    }

    #[test]
    fn missing_creator_rejected() {
        let mut req = request(&["u1"], 5, "demo");
        req.creator_id = MemberId::new("");
        assert_eq!(
            req.into_draft(Timestamp::EPOCH),
            Err(InvalidInput::MissingField("creator"))
        );
    }

    #[test]
    fn oversized_ids_rejected() {
        let long = "x".repeat(foul_types::MAX_ID_LEN + 1);
        let mut req = request(&["u1"], 5, "demo");
        req.gainer_ids.push(MemberId::new(long.as_str()));
        assert_eq!(
            req.into_draft(Timestamp::EPOCH),
            Err(InvalidInput::IdTooLong("gainer"))
        );

        let mut req = request(&["u1"], 5, "demo");
        req.channel_id = ChannelId::new(long);
        assert_eq!(
            req.into_draft(Timestamp::EPOCH),
            Err(InvalidInput::IdTooLong("channel"))
        );
    }
}
