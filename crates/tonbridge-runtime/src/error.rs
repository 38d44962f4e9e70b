//! Attachment error types.

use thiserror::Error;
use tonbridge_core::BridgeError;

/// The managed runtime refused to bind the current thread.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AttachError(String);

impl AttachError {
    /// Create an attach error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<AttachError> for BridgeError {
    fn from(err: AttachError) -> Self {
        Self::AttachFailure(err.0)
    }
}
