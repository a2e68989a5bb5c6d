//! Metadata storage trait.

use crate::StoreError;

/// Generic key-value bookkeeping that doesn't belong to polls or votes.
pub trait MetaStore {
    /// Store a metadata value.
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a metadata value.
    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Get the current database schema version; 0 for a fresh database.
    fn get_schema_version(&self) -> Result<u32, StoreError>;

    /// Set the database schema version.
    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;
}
