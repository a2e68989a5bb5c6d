use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid key: {0}")]
    Key(#[from] foul_types::KeyTooLong),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<bincode::Error> for LmdbError {
    fn from(e: bincode::Error) -> Self {
        LmdbError::Serialization(e.to_string())
    }
}

impl From<LmdbError> for foul_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::NotFound(what) => foul_store::StoreError::NotFound(what),
            LmdbError::Serialization(msg) => foul_store::StoreError::Serialization(msg),
            LmdbError::Key(e) => foul_store::StoreError::from(e),
            other => foul_store::StoreError::Backend(other.to_string()),
        }
    }
}
