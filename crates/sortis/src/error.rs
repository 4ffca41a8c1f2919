//! Client error types.

use sortis_core::CoreError;
use sortis_networking::{ApiError, SyncError, TransportError};
use thiserror::Error;

/// Client errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortisError {
    /// Config file could not be read.
    #[error("config i/o error at {path}: {reason}")]
    ConfigIo {
        /// File path.
        path: String,
        /// Why.
        reason: String,
    },

    /// Config did not parse.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config parsed but holds an unusable value.
    #[error("invalid config value {field}: {reason}")]
    ConfigInvalid {
        /// Offending key.
        field: &'static str,
        /// Why it is rejected.
        reason: String,
    },

    /// A roll was requested while the dice are still moving.
    #[error("dice are still rolling")]
    RollInProgress,

    /// Rules error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Synchronizer error.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Battle API error.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<toml::de::Error> for SortisError {
    fn from(e: toml::de::Error) -> Self {
        Self::ConfigParse(e.to_string())
    }
}

/// Result type for client operations.
pub type SortisResult<T> = Result<T, SortisError>;
