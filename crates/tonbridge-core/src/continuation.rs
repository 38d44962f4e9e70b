//! The managed-runtime side of the bridge.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::event::ResponseEvent;
use crate::ids::AppId;

/// Error raised by a continuation while handling an event.
///
/// The dispatcher logs it and moves on; it never reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ContinuationError(String);

impl ContinuationError {
    /// Create a continuation error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// A caller-supplied callable invoked with the results of a request.
///
/// Implementations wrap whatever the managed runtime uses to receive results
/// (a promise, a listener object). The dispatcher only calls these methods
/// while the current thread is attached to the runtime, and may call them
/// from any engine thread, so implementations must be `Send + Sync`.
///
/// A continuation is pinned for as long as its correlation entry lives and is
/// dropped exactly once afterwards. Implementations that hold a runtime
/// reference should release it in `Drop`.
pub trait Continuation: Send + Sync {
    /// Deliver an event for a one-shot request.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime rejected the call.
    fn invoke_one_shot(&self, event: ResponseEvent) -> Result<(), ContinuationError>;

    /// Deliver an event for a request issued under an application id.
    ///
    /// Defaults to [`invoke_one_shot`](Self::invoke_one_shot).
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime rejected the call.
    fn invoke_for_application(
        &self,
        app_id: AppId,
        event: ResponseEvent,
    ) -> Result<(), ContinuationError> {
        let _ = app_id;
        self.invoke_one_shot(event)
    }
}

/// Shared, pinned reference to a continuation.
pub type ContinuationHandle = Arc<dyn Continuation>;

/// Adapter turning a closure into a [`Continuation`].
pub struct FnContinuation<F> {
    f: F,
}

impl<F> FnContinuation<F>
where
    F: Fn(ResponseEvent) -> Result<(), ContinuationError> + Send + Sync,
{
    /// Wrap a closure.
    #[must_use]
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Continuation for FnContinuation<F>
where
    F: Fn(ResponseEvent) -> Result<(), ContinuationError> + Send + Sync,
{
    fn invoke_one_shot(&self, event: ResponseEvent) -> Result<(), ContinuationError> {
        (self.f)(event)
    }
}

impl<F> fmt::Debug for FnContinuation<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnContinuation").finish_non_exhaustive()
    }
}

/// Build a [`ContinuationHandle`] from a closure.
#[must_use]
pub fn continuation_fn<F>(f: F) -> ContinuationHandle
where
    F: Fn(ResponseEvent) -> Result<(), ContinuationError> + Send + Sync + 'static,
{
    Arc::new(FnContinuation::new(f))
}
