//! Fundamental types for foulbot.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! platform identifiers, timestamps, polls, their outcomes and leaderboard entries.

pub mod id;
pub mod leaderboard;
pub mod poll;
pub mod time;

pub use id::{ChannelId, KeyTooLong, MemberId, MessageId, PollKey, MAX_ID_LEN};
pub use leaderboard::LeaderboardEntry;
pub use poll::{EvaluatedPoll, Poll, PollDraft, PollOutcome, VoteTally};
pub use time::{Clock, SystemClock, Timestamp};
