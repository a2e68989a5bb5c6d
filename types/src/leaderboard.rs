//! Leaderboard rows.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::id::MemberId;

/// One member's total for a year.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub member_id: MemberId,
    pub total_points: i64,
}

impl LeaderboardEntry {
    pub fn new(member_id: MemberId, total_points: i64) -> Self {
        Self {
            member_id,
            total_points,
        }
    }

    /// Build a row from a total summed in `i128`, clamping it to the
    /// `i64` range.
    pub fn clamped(member_id: MemberId, total: i128) -> Self {
        let total_points = i64::try_from(total)
            .unwrap_or(if total > 0 { i64::MAX } else { i64::MIN });
        Self::new(member_id, total_points)
    }

    /// Ranking order: highest total first, then member id ascending.
    pub fn rank_cmp(a: &Self, b: &Self) -> Ordering {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.member_id.cmp(&b.member_id))
    }
}
