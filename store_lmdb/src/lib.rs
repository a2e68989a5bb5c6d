//! LMDB storage backend for foulbot.
//!
//! Implements the storage traits from `foul-store` using the `heed` LMDB bindings.
//! Polls, gainers, votes and the pending-expiry index are separate named
//! databases inside a single environment, so one write transaction can touch
//! all of them atomically.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod keys;
pub mod meta;
pub mod migration;
pub mod poll;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use meta::LmdbMetaStore;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use poll::LmdbPollStore;
