//! Abstract storage traits for foulbot.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The poll engine depends only on the traits.

pub mod error;
pub mod meta;
pub mod poll;

pub use error::StoreError;
pub use meta::MetaStore;
pub use poll::{Finalization, PollStore};
