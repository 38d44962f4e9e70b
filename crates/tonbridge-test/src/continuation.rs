//! Recording continuation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use tonbridge_core::{AppId, Continuation, ContinuationError, ResponseEvent};
use tonbridge_runtime::ManagedRuntime;

use crate::engine::lock;

/// One invocation seen by a [`RecordingContinuation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Application id, for persistent-route invocations.
    pub app_id: Option<AppId>,
    /// The delivered event.
    pub event: ResponseEvent,
    /// Thread the continuation ran on.
    pub thread: ThreadId,
    /// Whether that thread was attached to the runtime (always `true` when
    /// no runtime was given).
    pub attached: bool,
}

/// Shared record of what a [`RecordingContinuation`] saw.
///
/// Outlives the continuation, so tests can check it was released.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<RecordedEvent>>,
    released: AtomicUsize,
    released_attached: AtomicUsize,
}

impl EventLog {
    /// Every invocation, in order.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        lock(&self.events).clone()
    }

    /// Payloads of every invocation, in order.
    #[must_use]
    pub fn payloads(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .map(|recorded| recorded.event.payload.clone())
            .collect()
    }

    /// Number of invocations.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    /// Whether the continuation was never invoked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Times the continuation was dropped.
    #[must_use]
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Times the continuation was dropped on an attached thread.
    #[must_use]
    pub fn released_while_attached(&self) -> usize {
        self.released_attached.load(Ordering::SeqCst)
    }

    /// Poll until at least `count` invocations were recorded.
    ///
    /// Returns `false` on timeout.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if self.len() >= count {
                return true;
            }
            if deadline.is_none_or(|d| Instant::now() >= d) {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

/// What a [`RecordingContinuation`] does after recording an event.
#[derive(Debug, Clone, Default)]
enum Behavior {
    #[default]
    Succeed,
    Fail(String),
    Panic(String),
}

/// [`Continuation`] that records every event into an [`EventLog`].
pub struct RecordingContinuation {
    log: Arc<EventLog>,
    runtime: Option<Arc<dyn ManagedRuntime>>,
    behavior: Behavior,
}

impl RecordingContinuation {
    /// Create a continuation with a fresh log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: Arc::new(EventLog::default()),
            runtime: None,
            behavior: Behavior::Succeed,
        }
    }

    /// Record whether each invocation and the release ran attached.
    #[must_use]
    pub fn with_runtime(mut self, runtime: Arc<dyn ManagedRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Return an error from every invocation.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.behavior = Behavior::Fail(message.into());
        self
    }

    /// Panic in every invocation.
    #[must_use]
    pub fn panicking(mut self, message: impl Into<String>) -> Self {
        self.behavior = Behavior::Panic(message.into());
        self
    }

    /// The shared log.
    #[must_use]
    pub fn log(&self) -> Arc<EventLog> {
        Arc::clone(&self.log)
    }

    fn attached(&self) -> bool {
        self.runtime
            .as_ref()
            .is_none_or(|runtime| runtime.is_current_thread_attached())
    }

    fn record(&self, app_id: Option<AppId>, event: ResponseEvent) -> Result<(), ContinuationError> {
        lock(&self.log.events).push(RecordedEvent {
            app_id,
            event,
            thread: std::thread::current().id(),
            attached: self.attached(),
        });

        match &self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail(message) => Err(ContinuationError::new(message.clone())),
            Behavior::Panic(message) => panic!("{message}"),
        }
    }
}

impl Default for RecordingContinuation {
    fn default() -> Self {
        Self::new()
    }
}

impl Continuation for RecordingContinuation {
    fn invoke_one_shot(&self, event: ResponseEvent) -> Result<(), ContinuationError> {
        self.record(None, event)
    }

    fn invoke_for_application(
        &self,
        app_id: AppId,
        event: ResponseEvent,
    ) -> Result<(), ContinuationError> {
        self.record(Some(app_id), event)
    }
}

impl Drop for RecordingContinuation {
    fn drop(&mut self) {
        self.log.released.fetch_add(1, Ordering::SeqCst);
        if self.attached() {
            self.log.released_attached.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl std::fmt::Debug for RecordingContinuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingContinuation")
            .field("log", &self.log)
            .field("behavior", &self.behavior)
            .finish_non_exhaustive()
    }
}
