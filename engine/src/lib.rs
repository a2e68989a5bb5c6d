//! Poll engine for foulbot.
//!
//! A poll proposes that one or more gainers receive a signed number of
//! points. Members vote for or against until the poll expires; the periodic
//! sweep then tallies it exactly once:
//!
//! Pending → (expiry passed, swept) → Passed | Failed
//!
//! Passed polls feed the yearly leaderboard, which is derived at query time.
//!
//! Key rule: strict majority of cast votes. Ties, including 0–0, fail.

pub mod engine;
pub mod error;
pub mod request;

pub use engine::{EngineConfig, PollEngine, DEFAULT_POLL_DURATION_SECS};
pub use error::{EngineError, InvalidInput};
pub use request::{dedup_gainers, PollRequest};
