//! foulbot runtime: orchestrates the poll engine and the chat surface.
//!
//! The runtime:
//! - Loads configuration and initialises logging
//! - Opens and checks the LMDB poll store
//! - Turns member requests into polls and votes, rate-limiting creators
//! - Sweeps expired polls on a fixed interval and announces their results
//! - Renders leaderboards on request
//! - Counts what happened in a Prometheus registry

pub mod config;
pub mod cooldown;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod notifier;
pub mod render;
pub mod runner;
pub mod runtime;
pub mod scheduler;
pub mod shutdown;

pub use config::BotConfig;
pub use cooldown::CreatorCooldown;
pub use error::BotError;
pub use handlers::{Bot, BotSettings, VoteIntent};
pub use logging::{init_logging, LogFormat};
pub use metrics::BotMetrics;
pub use notifier::{LogNotifier, Notifier, Posted, RecordingNotifier};
pub use render::{LeaderboardView, MessageView, PollCreatedView, PollResolvedView};
pub use runner::StoreRunner;
pub use runtime::{open_storage, reset_storage, BotRuntime, LmdbBot, LAST_RESET_KEY};
pub use scheduler::{Scheduler, TickReport};
pub use shutdown::ShutdownController;
