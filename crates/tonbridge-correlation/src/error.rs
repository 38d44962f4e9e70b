//! Correlation table error types.

use thiserror::Error;
use tonbridge_core::{BridgeError, CorrelationKey};

/// Errors returned by [`CorrelationTable`](crate::CorrelationTable).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    /// No live entry for the key: already finalized, unregistered, or never
    /// registered.
    #[error("no live correlation entry for {0}")]
    NotFound(CorrelationKey),

    /// The configured live-entry limit was reached.
    #[error("correlation table is full ({limit} live entries)")]
    CapacityExceeded {
        /// Configured limit.
        limit: usize,
    },

    /// Every non-zero token value is live.
    #[error("every correlation token is in use")]
    TokenSpaceExhausted,
}

impl From<CorrelationError> for BridgeError {
    fn from(err: CorrelationError) -> Self {
        match err {
            CorrelationError::NotFound(key) => Self::CorrelationNotFound(key),
            CorrelationError::CapacityExceeded { limit } => Self::CapacityExceeded { limit },
            CorrelationError::TokenSpaceExhausted => Self::TokenSpaceExhausted,
        }
    }
}

/// Result type for correlation table operations.
pub type CorrelationResult<T> = Result<T, CorrelationError>;
