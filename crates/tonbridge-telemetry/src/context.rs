//! Per-callback dispatch context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for one engine callback as it moves through the dispatcher.
///
/// Each callback gets its own `dispatch_id` so log lines from concurrent
/// engine threads can be told apart even when they share a request id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchContext {
    /// Unique identifier of this callback.
    pub dispatch_id: Uuid,
    /// Correlation route name (`one_shot`, `application`, `unregister`).
    pub route: String,
    /// Token or application id carried by the callback.
    pub request_id: u32,
    /// Raw response type code.
    pub kind: u32,
    /// Whether the engine marked this event as the last one.
    pub finished: bool,
    /// When the callback entered the bridge.
    pub started_at: DateTime<Utc>,
}

impl DispatchContext {
    /// Create a context for a callback.
    #[must_use]
    pub fn new(route: impl Into<String>, request_id: u32) -> Self {
        Self {
            dispatch_id: Uuid::new_v4(),
            route: route.into(),
            request_id,
            kind: 0,
            finished: false,
            started_at: Utc::now(),
        }
    }

    /// Set the response type code.
    #[must_use]
    pub fn with_kind(mut self, kind: u32) -> Self {
        self.kind = kind;
        self
    }

    /// Set the finished flag.
    #[must_use]
    pub fn with_finished(mut self, finished: bool) -> Self {
        self.finished = finished;
        self
    }

    /// Elapsed time since the callback entered the bridge.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        // started_at is set at creation, so now >= started_at
        #[allow(clippy::arithmetic_side_effects)]
        let elapsed = Utc::now() - self.started_at;
        elapsed
    }

    /// Elapsed time in microseconds.
    #[must_use]
    pub fn elapsed_us(&self) -> i64 {
        self.elapsed().num_microseconds().unwrap_or(i64::MAX)
    }

    /// A tracing span carrying this context.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::debug_span!(
            "dispatch",
            dispatch_id = %self.dispatch_id,
            route = %self.route,
            request_id = self.request_id,
            kind = self.kind,
            finished = self.finished,
        )
    }
}

/// Keeps a dispatch span entered and logs completion when dropped.
pub struct DispatchGuard {
    context: DispatchContext,
    /// Held to keep the span entered until the guard is dropped.
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl DispatchGuard {
    /// Enter the context's span.
    #[must_use]
    pub fn new(context: DispatchContext) -> Self {
        let span = context.span().entered();
        tracing::trace!("Dispatch started");
        Self { context, span }
    }

    /// The dispatch context.
    #[must_use]
    pub fn context(&self) -> &DispatchContext {
        &self.context
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        tracing::trace!(elapsed_us = self.context.elapsed_us(), "Dispatch completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_context_creation() {
        let ctx = DispatchContext::new("one_shot", 7)
            .with_kind(100)
            .with_finished(true);

        assert_eq!(ctx.route, "one_shot");
        assert_eq!(ctx.request_id, 7);
        assert_eq!(ctx.kind, 100);
        assert!(ctx.finished);
    }

    #[test]
    fn test_dispatch_ids_are_unique() {
        let a = DispatchContext::new("application", 1);
        let b = DispatchContext::new("application", 1);
        assert_ne!(a.dispatch_id, b.dispatch_id);
    }

    #[test]
    fn test_elapsed() {
        let ctx = DispatchContext::new("one_shot", 1);
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(ctx.elapsed_us() >= 5_000);
    }

    #[test]
    fn test_guard_exposes_context() {
        let guard = DispatchGuard::new(DispatchContext::new("unregister", 3));
        assert_eq!(guard.context().request_id, 3);
    }

    #[test]
    fn test_serialization() {
        let ctx = DispatchContext::new("one_shot", 42);
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"route\":\"one_shot\""));
        assert!(json.contains("\"request_id\":42"));

        let parsed: DispatchContext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ctx);
    }
}
