//! Scoped attachment of the calling thread.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{trace, warn};

use crate::error::AttachError;
use crate::runtime::ManagedRuntime;

/// Attach/detach counters.
///
/// Only attaches performed by the bridge are counted, so once every guard
/// has dropped the two numbers are equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachStats {
    /// Threads attached by the bridge.
    pub attaches: u64,
    /// Threads detached by the bridge.
    pub detaches: u64,
}

impl AttachStats {
    /// Whether every attach has been matched by a detach.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.attaches == self.detaches
    }
}

/// Runs closures with the calling thread attached to the managed runtime.
pub struct ThreadBridge {
    runtime: Arc<dyn ManagedRuntime>,
    attaches: AtomicU64,
    detaches: AtomicU64,
}

impl ThreadBridge {
    /// Create a thread bridge over a runtime.
    #[must_use]
    pub fn new(runtime: Arc<dyn ManagedRuntime>) -> Self {
        Self {
            runtime,
            attaches: AtomicU64::new(0),
            detaches: AtomicU64::new(0),
        }
    }

    /// The underlying runtime.
    #[must_use]
    pub fn runtime(&self) -> &Arc<dyn ManagedRuntime> {
        &self.runtime
    }

    /// Ensure the calling thread is attached until the guard drops.
    ///
    /// If the thread was already attached the guard does nothing on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot attach the thread.
    pub fn attach(&self) -> Result<AttachGuard<'_>, AttachError> {
        if self.runtime.is_current_thread_attached() {
            return Ok(AttachGuard {
                bridge: self,
                attached_here: false,
            });
        }

        self.runtime.attach_current_thread().inspect_err(|e| {
            warn!(error = %e, "Failed to attach thread to managed runtime");
        })?;
        self.attaches.fetch_add(1, Ordering::Relaxed);
        trace!(thread = ?std::thread::current().id(), "Attached thread");

        Ok(AttachGuard {
            bridge: self,
            attached_here: true,
        })
    }

    /// Run `f` with the calling thread attached.
    ///
    /// The thread is detached afterwards only if this call attached it. The
    /// detach also runs if `f` panics.
    ///
    /// # Errors
    ///
    /// Returns an error, without running `f`, if the thread cannot be attached.
    pub fn with_runtime_attached<T>(&self, f: impl FnOnce() -> T) -> Result<T, AttachError> {
        let _guard = self.attach()?;
        Ok(f())
    }

    /// Snapshot of the attach/detach counters.
    #[must_use]
    pub fn stats(&self) -> AttachStats {
        AttachStats {
            attaches: self.attaches.load(Ordering::Relaxed),
            detaches: self.detaches.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for ThreadBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadBridge")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Keeps the calling thread attached while alive.
#[must_use = "the thread is detached as soon as the guard drops"]
pub struct AttachGuard<'a> {
    bridge: &'a ThreadBridge,
    attached_here: bool,
}

impl AttachGuard<'_> {
    /// Whether this guard performed the attach.
    #[must_use]
    pub fn attached_here(&self) -> bool {
        self.attached_here
    }
}

impl Drop for AttachGuard<'_> {
    fn drop(&mut self) {
        if self.attached_here {
            self.bridge.runtime.detach_current_thread();
            self.bridge.detaches.fetch_add(1, Ordering::Relaxed);
            trace!(thread = ?std::thread::current().id(), "Detached thread");
        }
    }
}

impl fmt::Debug for AttachGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachGuard")
            .field("attached_here", &self.attached_here)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicBool;
    use std::thread::ThreadId;

    #[derive(Default)]
    struct TestRuntime {
        attached: Mutex<HashSet<ThreadId>>,
        refuse: AtomicBool,
    }

    impl TestRuntime {
        fn is_attached(&self, id: ThreadId) -> bool {
            self.attached.lock().unwrap().contains(&id)
        }
    }

    impl ManagedRuntime for TestRuntime {
        fn is_current_thread_attached(&self) -> bool {
            self.is_attached(std::thread::current().id())
        }

        fn attach_current_thread(&self) -> Result<(), AttachError> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(AttachError::new("runtime shutting down"));
            }
            self.attached
                .lock()
                .unwrap()
                .insert(std::thread::current().id());
            Ok(())
        }

        fn detach_current_thread(&self) {
            self.attached
                .lock()
                .unwrap()
                .remove(&std::thread::current().id());
        }
    }

    #[test]
    fn test_attaches_and_detaches_unattached_thread() {
        let runtime = Arc::new(TestRuntime::default());
        let bridge = ThreadBridge::new(runtime.clone());

        let inside = bridge
            .with_runtime_attached(|| runtime.is_current_thread_attached())
            .unwrap();

        assert!(inside);
        assert!(!runtime.is_current_thread_attached());
        assert_eq!(
            bridge.stats(),
            AttachStats {
                attaches: 1,
                detaches: 1
            }
        );
    }

    #[test]
    fn test_leaves_already_attached_thread_alone() {
        let runtime = Arc::new(TestRuntime::default());
        runtime.attach_current_thread().unwrap();
        let bridge = ThreadBridge::new(runtime.clone());

        let guard = bridge.attach().unwrap();
        assert!(!guard.attached_here());
        drop(guard);

        assert!(runtime.is_current_thread_attached());
        assert_eq!(bridge.stats(), AttachStats::default());
    }

    #[test]
    fn test_nested_calls_attach_once() {
        let runtime = Arc::new(TestRuntime::default());
        let bridge = ThreadBridge::new(runtime.clone());

        bridge
            .with_runtime_attached(|| {
                bridge
                    .with_runtime_attached(|| assert!(runtime.is_current_thread_attached()))
                    .unwrap();
                assert!(runtime.is_current_thread_attached());
            })
            .unwrap();

        assert!(!runtime.is_current_thread_attached());
        assert_eq!(bridge.stats().attaches, 1);
        assert!(bridge.stats().is_balanced());
    }

    #[test]
    fn test_detaches_on_panic() {
        let runtime = Arc::new(TestRuntime::default());
        let bridge = ThreadBridge::new(runtime.clone());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            bridge.with_runtime_attached(|| panic!("continuation blew up"))
        }));

        assert!(result.is_err());
        assert!(!runtime.is_current_thread_attached());
        assert!(bridge.stats().is_balanced());
    }

    #[test]
    fn test_attach_failure_skips_closure() {
        let runtime = Arc::new(TestRuntime::default());
        runtime.refuse.store(true, Ordering::SeqCst);
        let bridge = ThreadBridge::new(runtime);

        let mut ran = false;
        let err = bridge.with_runtime_attached(|| ran = true).unwrap_err();

        assert!(!ran);
        assert_eq!(err.to_string(), "runtime shutting down");
        assert_eq!(bridge.stats(), AttachStats::default());
    }

    #[test]
    fn test_balance_across_threads() {
        let runtime = Arc::new(TestRuntime::default());
        let bridge = ThreadBridge::new(runtime.clone());

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        bridge.with_runtime_attached(|| ()).unwrap();
                    }
                });
            }
        });

        let stats = bridge.stats();
        assert_eq!(stats.attaches, 800);
        assert!(stats.is_balanced());
        assert!(runtime.attached.lock().unwrap().is_empty());
    }
}
