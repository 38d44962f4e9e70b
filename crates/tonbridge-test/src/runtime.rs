//! Mock managed runtime.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::ThreadId;

use tonbridge_runtime::{AttachError, ManagedRuntime};

use crate::engine::lock;

/// [`ManagedRuntime`] that tracks attached threads in a set.
///
/// Counts every attach and detach call so tests can check the bridge keeps
/// them balanced, and can be told to refuse attachment.
#[derive(Debug, Default)]
pub struct MockRuntime {
    attached: Mutex<HashSet<ThreadId>>,
    refuse: AtomicBool,
    attach_calls: AtomicUsize,
    detach_calls: AtomicUsize,
}

impl MockRuntime {
    /// Create a runtime with no attached threads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every attach request.
    #[must_use]
    pub fn refusing(self) -> Self {
        self.set_refuse(true);
        self
    }

    /// Start or stop refusing attach requests.
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Whether `thread` is attached.
    #[must_use]
    pub fn is_attached(&self, thread: ThreadId) -> bool {
        lock(&self.attached).contains(&thread)
    }

    /// Number of currently attached threads.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        lock(&self.attached).len()
    }

    /// Successful attach calls so far.
    #[must_use]
    pub fn attach_calls(&self) -> usize {
        self.attach_calls.load(Ordering::SeqCst)
    }

    /// Detach calls so far.
    #[must_use]
    pub fn detach_calls(&self) -> usize {
        self.detach_calls.load(Ordering::SeqCst)
    }
}

impl ManagedRuntime for MockRuntime {
    fn is_current_thread_attached(&self) -> bool {
        self.is_attached(std::thread::current().id())
    }

    fn attach_current_thread(&self) -> Result<(), AttachError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(AttachError::new("mock runtime refuses attachment"));
        }
        lock(&self.attached).insert(std::thread::current().id());
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn detach_current_thread(&self) {
        lock(&self.attached).remove(&std::thread::current().id());
        self.detach_calls.fetch_add(1, Ordering::SeqCst);
    }
}
