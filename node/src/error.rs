use thiserror::Error;

use foul_engine::EngineError;

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("creator cooldown active, {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: u64 },

    #[error("chat adapter failure: {0}")]
    AdapterFailure(String),

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] foul_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BotError {
    /// Whether the requester caused the failure and can fix it themselves.
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::Engine(e) => e.is_invalid_input(),
            Self::CooldownActive { .. } => true,
            _ => false,
        }
    }
}
