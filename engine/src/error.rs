use foul_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Rejected before any persistence; safe to report to the requester.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// Persistence failed or timed out; the caller may retry later.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl EngineError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("can't give out 0 points")]
    InvalidPoints,

    #[error("at least one gainer is required")]
    NoGainers,

    #[error("a reason is required")]
    EmptyReason,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{0} id is too long")]
    IdTooLong(&'static str),
}
