//! The managed runtime's thread-binding contract.

use crate::error::AttachError;

/// A managed runtime whose execution environment is bound per native thread.
///
/// All three methods act on the calling thread only.
pub trait ManagedRuntime: Send + Sync {
    /// Whether the calling thread already has an execution environment.
    fn is_current_thread_attached(&self) -> bool;

    /// Bind an execution environment to the calling thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot bind the thread.
    fn attach_current_thread(&self) -> Result<(), AttachError>;

    /// Unbind the calling thread's execution environment.
    fn detach_current_thread(&self);
}

/// Runtime for hosts whose threads need no binding.
///
/// Every thread reports as attached, so the bridge never attaches or detaches.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedRuntime;

impl ManagedRuntime for DetachedRuntime {
    fn is_current_thread_attached(&self) -> bool {
        true
    }

    fn attach_current_thread(&self) -> Result<(), AttachError> {
        Ok(())
    }

    fn detach_current_thread(&self) {}
}
