//! Test fixtures.

use std::sync::{Arc, Once};

use tonbridge_core::{ContextHandle, ContinuationHandle};
use tonbridge_runtime::ManagedRuntime;

use crate::continuation::{EventLog, RecordingContinuation};

/// A context handle for tests.
#[must_use]
pub fn test_context() -> ContextHandle {
    ContextHandle::new(1)
}

/// A minimal context config.
#[must_use]
pub fn test_context_config() -> &'static str {
    r#"{"network":{"server_address":"http://localhost"}}"#
}

/// A recording continuation as a handle, plus its log.
#[must_use]
pub fn recording() -> (ContinuationHandle, Arc<EventLog>) {
    let continuation = RecordingContinuation::new();
    let log = continuation.log();
    (Arc::new(continuation), log)
}

/// Like [`recording`], also noting whether calls ran attached to `runtime`.
#[must_use]
pub fn recording_with_runtime(
    runtime: Arc<dyn ManagedRuntime>,
) -> (ContinuationHandle, Arc<EventLog>) {
    let continuation = RecordingContinuation::new().with_runtime(runtime);
    let log = continuation.log();
    (Arc::new(continuation), log)
}

/// Install a test-writer subscriber honoring `RUST_LOG`, once per process.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .with_thread_ids(true)
            .try_init();
    });
}
