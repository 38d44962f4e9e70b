//! Routing of engine callbacks to continuations.
//!
//! Every callback goes through the same steps: resolve the request id in the
//! correlation table (lock held only for the lookup), attach the engine
//! thread to the managed runtime, copy the payload out of engine memory,
//! invoke the continuation, and release whatever the table handed over. The
//! release happens inside the attached scope so continuations backed by
//! runtime references can free them.
//!
//! Nothing here returns an error to the engine. Failures are logged, counted
//! in [`DispatchStats`], and reported through [`DispatchOutcome`].

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use tonbridge_core::{
    AppId, BridgeError, BridgeResult, ContinuationError, CorrelationKey, CorrelationToken,
    ResponseEvent, ResponseHandler, ResponseKind, ResponseRoute, decode_payload,
};
use tonbridge_correlation::CorrelationTable;
use tonbridge_runtime::{AttachError, ThreadBridge};
use tonbridge_telemetry::{DispatchContext, DispatchGuard};

/// Why a callback was not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No live entry for the request id.
    NotFound(CorrelationKey),
    /// The payload was not valid UTF-8.
    Encoding,
    /// The engine thread could not be attached to the runtime.
    AttachFailure,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "no live entry for {key}"),
            Self::Encoding => f.write_str("payload is not valid UTF-8"),
            Self::AttachFailure => f.write_str("thread could not be attached"),
        }
    }
}

/// What happened to one callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The continuation ran and returned normally.
    Delivered {
        /// Whether the correlation entry was removed by this callback.
        retired: bool,
    },
    /// The continuation ran but returned an error or panicked. The entry
    /// lifecycle is the same as for a delivered event.
    Failed {
        /// Whether the correlation entry was removed by this callback.
        retired: bool,
    },
    /// The continuation did not run.
    Dropped(DropReason),
}

impl DispatchOutcome {
    /// Whether the continuation ran and succeeded.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// Whether the correlation entry was removed by this callback.
    #[must_use]
    pub fn retired(&self) -> bool {
        matches!(
            self,
            Self::Delivered { retired: true } | Self::Failed { retired: true }
        )
    }
}

/// Snapshot of dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events delivered to a continuation that returned normally.
    pub delivered: u64,
    /// Correlation entries removed by a callback.
    pub retired: u64,
    /// Callbacks with no live entry.
    pub not_found: u64,
    /// Callbacks whose payload could not be decoded.
    pub encoding_failures: u64,
    /// Callbacks dropped because the thread could not be attached.
    pub attach_failures: u64,
    /// Continuations that returned an error or panicked.
    pub continuation_failures: u64,
}

impl DispatchStats {
    /// Callbacks that never reached a continuation.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.not_found
            .saturating_add(self.encoding_failures)
            .saturating_add(self.attach_failures)
    }
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    retired: AtomicU64,
    not_found: AtomicU64,
    encoding_failures: AtomicU64,
    attach_failures: AtomicU64,
    continuation_failures: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Receives engine callbacks and runs the matching continuations.
pub struct CallbackDispatcher {
    table: Arc<CorrelationTable>,
    threads: ThreadBridge,
    counters: Counters,
    log_dropped_events: bool,
}

impl CallbackDispatcher {
    /// Create a dispatcher over a table and a thread bridge.
    #[must_use]
    pub fn new(table: Arc<CorrelationTable>, threads: ThreadBridge) -> Self {
        Self {
            table,
            threads,
            counters: Counters::default(),
            log_dropped_events: true,
        }
    }

    /// Log dropped callbacks at `warn` (true) or `debug` (false).
    #[must_use]
    pub fn with_log_dropped_events(mut self, enabled: bool) -> Self {
        self.log_dropped_events = enabled;
        self
    }

    /// The correlation table.
    #[must_use]
    pub fn table(&self) -> &Arc<CorrelationTable> {
        &self.table
    }

    /// The thread bridge.
    #[must_use]
    pub fn threads(&self) -> &ThreadBridge {
        &self.threads
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        let c = &self.counters;
        DispatchStats {
            delivered: c.delivered.load(Ordering::Relaxed),
            retired: c.retired.load(Ordering::Relaxed),
            not_found: c.not_found.load(Ordering::Relaxed),
            encoding_failures: c.encoding_failures.load(Ordering::Relaxed),
            attach_failures: c.attach_failures.load(Ordering::Relaxed),
            continuation_failures: c.continuation_failures.load(Ordering::Relaxed),
        }
    }

    /// Handle one engine callback.
    ///
    /// `payload` is only read during this call.
    pub fn dispatch(
        &self,
        route: ResponseRoute,
        request_id: u32,
        payload: &[u8],
        kind: ResponseKind,
        finished: bool,
    ) -> DispatchOutcome {
        let _guard = DispatchGuard::new(
            DispatchContext::new(route.to_string(), request_id)
                .with_kind(kind.get())
                .with_finished(finished),
        );

        match route {
            ResponseRoute::OneShot => self.dispatch_one_shot(
                CorrelationToken::from_raw(request_id),
                payload,
                kind,
                finished,
            ),
            ResponseRoute::Application | ResponseRoute::Unregister => self.dispatch_application(
                AppId::new(request_id),
                route == ResponseRoute::Unregister,
                payload,
                kind,
                finished,
            ),
        }
    }

    fn dispatch_one_shot(
        &self,
        token: CorrelationToken,
        payload: &[u8],
        kind: ResponseKind,
        finished: bool,
    ) -> DispatchOutcome {
        let Ok(resolved) = self.table.resolve(token, finished) else {
            return self.drop_unmatched(CorrelationKey::Token(token));
        };
        let retired = resolved.is_retired();

        // `resolved` moves into the closure so a retired entry is released
        // while the thread is still attached.
        let result = self.threads.with_runtime_attached(move || {
            let event = ResponseEvent::new(kind, decode_payload(payload)?, finished);
            invoke_guarded(|| resolved.continuation().invoke_one_shot(event))
        });

        self.finish(CorrelationKey::Token(token), result, retired)
    }

    fn dispatch_application(
        &self,
        app_id: AppId,
        unregister: bool,
        payload: &[u8],
        kind: ResponseKind,
        finished: bool,
    ) -> DispatchOutcome {
        let key = CorrelationKey::Application(app_id);
        let Ok(continuation) = self.table.resolve_for_application(app_id) else {
            return self.drop_unmatched(key);
        };

        let result = self.threads.with_runtime_attached(move || {
            let delivered = decode_payload(payload).and_then(|text| {
                let event = ResponseEvent::new(kind, text, finished);
                invoke_guarded(|| continuation.invoke_for_application(app_id, event))
            });
            drop(continuation);

            // The entry goes after the continuation has seen the event.
            let retired = unregister && self.table.unregister(app_id).is_ok();
            (delivered, retired)
        });

        match result {
            Ok((delivered, retired)) => self.finish(key, Ok(delivered), retired),
            Err(e) => {
                // The unregister callback is the entry's only removal trigger,
                // so it is removed even though the event is dropped.
                let retired = unregister && self.table.unregister(app_id).is_ok();
                self.finish(key, Err(e), retired)
            },
        }
    }

    /// Turn the attached-scope result into an outcome, logging and counting.
    fn finish(
        &self,
        key: CorrelationKey,
        result: Result<BridgeResult<()>, AttachError>,
        retired: bool,
    ) -> DispatchOutcome {
        if retired {
            bump(&self.counters.retired);
        }

        match result {
            Ok(Ok(())) => {
                bump(&self.counters.delivered);
                debug!(%key, retired, "Delivered event");
                DispatchOutcome::Delivered { retired }
            },
            Ok(Err(BridgeError::Encoding(e))) => {
                warn!(%key, error = %e, retired, "Dropping event with undecodable payload");
                bump(&self.counters.encoding_failures);
                DispatchOutcome::Dropped(DropReason::Encoding)
            },
            Ok(Err(e)) => {
                warn!(%key, error = %e, retired, "Continuation failed");
                bump(&self.counters.continuation_failures);
                DispatchOutcome::Failed { retired }
            },
            Err(e) => {
                warn!(%key, error = %e, retired, "Dropping event, thread could not be attached");
                bump(&self.counters.attach_failures);
                DispatchOutcome::Dropped(DropReason::AttachFailure)
            },
        }
    }

    fn drop_unmatched(&self, key: CorrelationKey) -> DispatchOutcome {
        bump(&self.counters.not_found);
        if self.log_dropped_events {
            warn!(%key, "Dropping callback with no live correlation entry");
        } else {
            debug!(%key, "Dropping callback with no live correlation entry");
        }
        DispatchOutcome::Dropped(DropReason::NotFound(key))
    }
}

impl ResponseHandler for CallbackDispatcher {
    fn handle(
        &self,
        route: ResponseRoute,
        request_id: u32,
        payload: &[u8],
        kind: ResponseKind,
        finished: bool,
    ) {
        let _ = self.dispatch(route, request_id, payload, kind, finished);
    }
}

impl fmt::Debug for CallbackDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackDispatcher")
            .field("table", &self.table)
            .field("threads", &self.threads)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Run a continuation, turning errors and panics into [`BridgeError`].
fn invoke_guarded(f: impl FnOnce() -> Result<(), ContinuationError>) -> BridgeResult<()> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result.map_err(|e| BridgeError::ContinuationFailed(e.to_string())),
        Err(payload) => Err(BridgeError::ContinuationFailed(format!(
            "panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
