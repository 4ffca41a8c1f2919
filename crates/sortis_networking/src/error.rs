//! # Networking Error Types
//!
//! Three failure classes, kept apart on purpose:
//!
//! - [`TransportError`]: the socket (retryable)
//! - [`SyncError`]: synchronizer faults, some of them fatal
//! - [`ApiError`]: REST battle contract failures

use sortis_core::{BattleId, CoreError, DiceTriple, Hand};
use thiserror::Error;

/// Socket-level failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Operation needs a live connection.
    #[error("not connected")]
    NotConnected,

    /// The server refused or could not be reached.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// The connection dropped.
    #[error("connection closed")]
    ConnectionClosed,

    /// A frame or body could not be encoded/decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(String),

    /// Gave up waiting for the handshake.
    #[error("timed out waiting for connection")]
    Timeout,
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Synchronizer failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Action not allowed in the current phase.
    #[error("{action} not allowed in phase {phase}")]
    WrongPhase {
        /// Attempted action.
        action: &'static str,
        /// Current phase.
        phase: &'static str,
    },

    /// Gave up connecting.
    #[error("connection failed after {attempts} attempts")]
    RetryBudgetExhausted {
        /// Attempts made.
        attempts: u32,
    },

    /// The server's hand disagrees with the local table. Never expected.
    #[error("hand divergence on {dice}: server {server:?}, local {local:?}")]
    HandDivergence {
        /// Dice in question.
        dice: DiceTriple,
        /// What the server said.
        server: Hand,
        /// What the local table says.
        local: Hand,
    },

    /// A payload could not be decoded or failed validation.
    #[error("malformed payload on {topic}: {reason}")]
    MalformedPayload {
        /// Topic it arrived on.
        topic: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The server broke a draft invariant.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The server ended the session (e.g. draft cancelled).
    #[error("session aborted by server: {0}")]
    Aborted(String),

    /// Transport failure underneath.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

impl SyncError {
    /// True for errors that end the session.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RetryBudgetExhausted { .. }
                | Self::HandDivergence { .. }
                | Self::ProtocolViolation(_)
                | Self::Aborted(_)
        )
    }
}

/// REST battle contract failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Unknown battle.
    #[error("battle not found: {0}")]
    BattleNotFound(BattleId),

    /// Request rejected.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Rule violation (e.g. rolling in a finished battle).
    #[error(transparent)]
    Rules(#[from] CoreError),

    /// Transport failure underneath.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for synchronizer operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for battle API calls.
pub type ApiResult<T> = Result<T, ApiError>;
