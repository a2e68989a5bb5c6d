//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::meta::LmdbMetaStore;
use crate::poll::LmdbPollStore;
use crate::LmdbError;

/// Default LMDB map size: 256 MiB. Polls and votes are tiny.
pub const DEFAULT_MAP_SIZE: usize = 256 << 20;
/// Number of named LMDB databases.
pub const MAX_DBS: u32 = 8;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    path: PathBuf,
    env: Arc<Env>,
    pub(crate) polls_db: Database<Bytes, Bytes>,
    pub(crate) gainers_db: Database<Bytes, Bytes>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
    pub(crate) expiry_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, creating every
    /// named database that does not exist yet.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process and the data
        // file is not modified by anything other than this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let polls_db = env.create_database(&mut wtxn, Some("polls"))?;
        let gainers_db = env.create_database(&mut wtxn, Some("gainers"))?;
        let votes_db = env.create_database(&mut wtxn, Some("votes"))?;
        let expiry_db = env.create_database(&mut wtxn, Some("expiry"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "LMDB environment opened");

        Ok(Self {
            path: path.to_path_buf(),
            env: Arc::new(env),
            polls_db,
            gainers_db,
            votes_db,
            expiry_db,
            meta_db,
        })
    }

    /// Open with the default database count and map size.
    pub fn open_default(path: &Path) -> Result<Self, LmdbError> {
        Self::open(path, MAX_DBS, DEFAULT_MAP_SIZE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// Flush dirty pages to disk.
    pub fn force_sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }

    /// Handle implementing [`foul_store::PollStore`].
    pub fn poll_store(&self) -> LmdbPollStore {
        LmdbPollStore {
            env: Arc::clone(&self.env),
            polls_db: self.polls_db,
            gainers_db: self.gainers_db,
            votes_db: self.votes_db,
            expiry_db: self.expiry_db,
        }
    }

    /// Handle implementing [`foul_store::MetaStore`].
    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }
}
