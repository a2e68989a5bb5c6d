//! Shared utilities for foulbot.

pub mod text;
pub mod time;

pub use text::{join_or, truncate};
pub use time::format_duration;
