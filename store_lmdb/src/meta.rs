//! LMDB implementation of MetaStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use foul_store::meta::MetaStore;
use foul_store::StoreError;

use crate::LmdbError;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

#[derive(Clone)]
pub struct LmdbMetaStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl MetaStore for LmdbMetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("meta key '{}'", key)))?;
        Ok(val.to_vec())
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, SCHEMA_VERSION_KEY)
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization(
                        "schema_version has unexpected byte length".to_string(),
                    )
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        let bytes = version.to_le_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, SCHEMA_VERSION_KEY, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    #[test]
    fn fresh_database_reports_version_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env = LmdbEnvironment::open_default(dir.path()).expect("open");
        assert_eq!(env.meta_store().get_schema_version().unwrap(), 0);
    }

    #[test]
    fn schema_version_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env = LmdbEnvironment::open_default(dir.path()).expect("open");
        let meta = env.meta_store();
        meta.set_schema_version(3).unwrap();
        assert_eq!(meta.get_schema_version().unwrap(), 3);
    }

    #[test]
    fn missing_meta_key_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env = LmdbEnvironment::open_default(dir.path()).expect("open");
        let meta = env.meta_store();
        assert!(matches!(meta.get_meta("nope"), Err(StoreError::NotFound(_))));
        meta.put_meta("last_reset", b"1700000000").unwrap();
        assert_eq!(meta.get_meta("last_reset").unwrap(), b"1700000000");
    }
}
