//! Bridge error types.

use thiserror::Error;

use crate::ids::CorrelationKey;

/// Errors that can occur while bridging a request or a callback.
///
/// None of these ever propagate back to the engine: callback-side failures
/// are logged and the event is dropped.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A payload could not be converted to runtime text.
    #[error("payload is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// A callback arrived for a key with no live entry.
    #[error("no live correlation entry for {0}")]
    CorrelationNotFound(CorrelationKey),

    /// The current thread could not be bound to the managed runtime.
    #[error("failed to attach thread to managed runtime: {0}")]
    AttachFailure(String),

    /// The continuation reported an error or panicked.
    #[error("continuation failed: {0}")]
    ContinuationFailed(String),

    /// The correlation table reached its configured live-entry limit.
    #[error("correlation table is full ({limit} live entries)")]
    CapacityExceeded {
        /// Configured limit.
        limit: usize,
    },

    /// Every correlation token value is currently live.
    #[error("every correlation token is in use")]
    TokenSpaceExhausted,

    /// A string is too long for the engine's `u32` length field.
    #[error("string of {len} bytes exceeds the engine's length limit")]
    PayloadTooLarge {
        /// Length in bytes.
        len: usize,
    },

    /// The engine refused to accept a request.
    #[error("engine rejected request: {0}")]
    Submission(String),

    /// A bridge is already installed for this process.
    #[error("a bridge is already installed for this process")]
    AlreadyInstalled,

    /// No bridge is installed for this process.
    #[error("no bridge is installed for this process")]
    NotInstalled,
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
