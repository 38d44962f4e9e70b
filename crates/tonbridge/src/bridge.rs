//! The bridge facade.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use tonbridge_config::BridgeConfig;
use tonbridge_core::{
    AppId, BridgeResult, ContextHandle, ContinuationHandle, CorrelationToken, Engine,
    ResponseHandler, ResponseKind, ResponseRoute, ResponseTarget,
};
use tonbridge_correlation::{CorrelationTable, RequestOrigin};
use tonbridge_runtime::{AttachStats, ManagedRuntime, ThreadBridge};

use crate::context::ContextRegistry;
use crate::dispatcher::{CallbackDispatcher, DispatchOutcome, DispatchStats};
use crate::sync;

/// Connects one engine to one managed runtime.
///
/// Owns the correlation table and the dispatcher. Requests go out through
/// the engine; callbacks come back through [`dispatch`](Self::dispatch),
/// either directly from the engine's [`ResponseTarget`] or through the
/// process-wide trampolines in [`crate::ffi`].
pub struct Bridge {
    engine: Arc<dyn Engine>,
    contexts: ContextRegistry,
    table: Arc<CorrelationTable>,
    dispatcher: Arc<CallbackDispatcher>,
    warn_on_shutdown_leaks: bool,
}

impl Bridge {
    /// Create a bridge.
    #[must_use]
    pub fn new(
        engine: Arc<dyn Engine>,
        runtime: Arc<dyn ManagedRuntime>,
        config: &BridgeConfig,
    ) -> Self {
        let table = Arc::new(
            CorrelationTable::new().with_max_live_entries(config.correlation.max_live_entries),
        );
        let dispatcher = Arc::new(
            CallbackDispatcher::new(Arc::clone(&table), ThreadBridge::new(runtime))
                .with_log_dropped_events(config.dispatch.log_dropped_events),
        );

        Self {
            contexts: ContextRegistry::new(Arc::clone(&engine)),
            engine,
            table,
            dispatcher,
            warn_on_shutdown_leaks: config.correlation.warn_on_shutdown_leaks,
        }
    }

    /// Create a bridge with the default configuration.
    #[must_use]
    pub fn with_defaults(engine: Arc<dyn Engine>, runtime: Arc<dyn ManagedRuntime>) -> Self {
        Self::new(engine, runtime, &BridgeConfig::default())
    }

    /// Create an engine context; returns the engine's JSON result verbatim.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the result is not valid UTF-8.
    pub fn create_context(&self, config: &str) -> BridgeResult<String> {
        self.contexts.create_context(config)
    }

    /// Destroy an engine context. In-flight requests are left alone.
    pub fn destroy_context(&self, context: ContextHandle) {
        self.contexts.destroy_context(context);
    }

    /// Submit a request whose callbacks go to `continuation`.
    ///
    /// The continuation is registered before the engine sees the request,
    /// so a callback can never race ahead of its entry. If the engine
    /// refuses the request the entry is removed again.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is full or the engine refuses the
    /// request. In both cases the continuation is never invoked.
    pub fn request_async(
        &self,
        context: ContextHandle,
        function: &str,
        params: &str,
        continuation: ContinuationHandle,
    ) -> BridgeResult<CorrelationToken> {
        let token = self
            .table
            .register_with_origin(continuation, RequestOrigin::new(context, function))?;

        let target = ResponseTarget::new(ResponseRoute::OneShot, token.get(), self.handler());
        if let Err(e) = self.engine.request(context, function, params, target) {
            warn!(%token, %context, function, error = %e, "Engine refused request");
            // Callbacks for a refused request never arrive.
            drop(self.table.cancel(token));
            return Err(e);
        }

        debug!(%token, %context, function, "Submitted request");
        Ok(token)
    }

    /// Submit a request under an application id.
    ///
    /// `continuation` becomes the persistent continuation for `app_id`,
    /// replacing any previous one, and receives every callback for the id
    /// until it is unregistered.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the request. The registration
    /// stays in place.
    pub fn request_for_application(
        &self,
        context: ContextHandle,
        function: &str,
        params: &str,
        app_id: AppId,
        continuation: ContinuationHandle,
    ) -> BridgeResult<()> {
        self.submit_for_application(
            ResponseRoute::Application,
            context,
            function,
            params,
            app_id,
            continuation,
        )
    }

    /// Submit the request that ends an application id's lifetime.
    ///
    /// `continuation` replaces the persistent continuation for `app_id`; it
    /// sees the first callback of this request, after which the entry is
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the request. The registration
    /// stays in place.
    pub fn unregister_application(
        &self,
        context: ContextHandle,
        function: &str,
        params: &str,
        app_id: AppId,
        continuation: ContinuationHandle,
    ) -> BridgeResult<()> {
        self.submit_for_application(
            ResponseRoute::Unregister,
            context,
            function,
            params,
            app_id,
            continuation,
        )
    }

    fn submit_for_application(
        &self,
        route: ResponseRoute,
        context: ContextHandle,
        function: &str,
        params: &str,
        app_id: AppId,
        continuation: ContinuationHandle,
    ) -> BridgeResult<()> {
        // A replaced continuation is released here, on the caller's thread.
        drop(self.table.register_for_application(app_id, continuation));

        let target = ResponseTarget::new(route, app_id.get(), self.handler());
        self.engine
            .request(context, function, params, target)
            .inspect_err(|e| {
                warn!(%app_id, %context, function, %route, error = %e, "Engine refused request");
            })?;

        debug!(%app_id, %context, function, %route, "Submitted application request");
        Ok(())
    }

    /// Run a request to completion on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the result is not valid UTF-8.
    pub fn request_sync(
        &self,
        context: ContextHandle,
        function: &str,
        params: &str,
    ) -> BridgeResult<String> {
        sync::request_sync(self.engine.as_ref(), context, function, params)
    }

    /// Route one engine callback.
    pub fn dispatch(
        &self,
        route: ResponseRoute,
        request_id: u32,
        payload: &[u8],
        kind: ResponseKind,
        finished: bool,
    ) -> DispatchOutcome {
        self.dispatcher
            .dispatch(route, request_id, payload, kind, finished)
    }

    /// Drop every live entry and return how many there were.
    ///
    /// Continuations are released with the calling thread attached. Any
    /// callback that arrives afterwards is dropped as unmatched.
    pub fn shutdown(&self) -> usize {
        let entries = self.table.drain();
        let count = entries.len();

        for entry in &entries {
            let function = entry.origin().map_or("", |origin| origin.function.as_str());
            if self.warn_on_shutdown_leaks {
                warn!(
                    key = %entry.key(),
                    function,
                    age_ms = entry.age_ms(),
                    "Correlation entry still live at shutdown"
                );
            } else {
                debug!(key = %entry.key(), function, "Releasing live entry at shutdown");
            }
        }

        if let Err(e) = self
            .dispatcher
            .threads()
            .with_runtime_attached(move || drop(entries))
        {
            warn!(error = %e, "Released live entries without attachment");
        }

        info!(released = count, "Bridge shut down");
        count
    }

    /// The correlation table.
    #[must_use]
    pub fn table(&self) -> &Arc<CorrelationTable> {
        &self.table
    }

    /// The callback dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<CallbackDispatcher> {
        &self.dispatcher
    }

    /// Dispatcher counters.
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// Attach/detach counters.
    #[must_use]
    pub fn attach_stats(&self) -> AttachStats {
        self.dispatcher.threads().stats()
    }

    fn handler(&self) -> Arc<dyn ResponseHandler> {
        Arc::clone(&self.dispatcher) as Arc<dyn ResponseHandler>
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
