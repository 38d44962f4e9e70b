//! Engine context lifecycle.

use std::sync::Arc;

use tracing::{debug, info};

use tonbridge_core::{BridgeResult, ContextHandle, Engine, decode_payload};

/// Forwards context creation and destruction to the engine.
///
/// Contexts are owned by the engine; the registry keeps no state of its own.
#[derive(Clone)]
pub struct ContextRegistry {
    engine: Arc<dyn Engine>,
}

impl ContextRegistry {
    /// Create a registry over an engine.
    #[must_use]
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Create a context from a JSON config.
    ///
    /// Returns the engine's JSON result verbatim, whether it reports success
    /// or an error. The engine-owned result is released before returning.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Encoding`](tonbridge_core::BridgeError::Encoding)
    /// if the result is not valid UTF-8, or the engine's error if the config
    /// could not be handed to it.
    pub fn create_context(&self, config: &str) -> BridgeResult<String> {
        let result = self.engine.create_context(config)?;
        let text = decode_payload(result.as_bytes());
        drop(result);

        debug!(bytes = text.as_ref().map_or(0, String::len), "Created engine context");
        text
    }

    /// Destroy a context.
    ///
    /// Fire-and-forget: live correlation entries for requests on this
    /// context are left alone, and their callbacks are still dispatched if
    /// the engine delivers them.
    pub fn destroy_context(&self, context: ContextHandle) {
        self.engine.destroy_context(context);
        info!(%context, "Destroyed engine context");
    }
}

impl std::fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonbridge_core::BridgeError;
    use tonbridge_test::MockEngine;

    #[test]
    fn test_create_context_passes_result_through() {
        let engine = Arc::new(
            MockEngine::new().with_create_context_result(r#"{"result":1}"#.as_bytes().to_vec()),
        );
        let registry = ContextRegistry::new(engine.clone());

        let result = registry.create_context(r#"{"network":{}}"#).unwrap();

        assert_eq!(result, r#"{"result":1}"#);
        assert_eq!(engine.created_configs(), vec![r#"{"network":{}}"#.to_string()]);
        assert_eq!(engine.strings_released(), 1);
    }

    #[test]
    fn test_engine_error_result_is_not_a_bridge_error() {
        let engine = Arc::new(MockEngine::new().with_create_context_result(
            br#"{"error":{"code":23,"message":"Invalid config"}}"#.to_vec(),
        ));
        let registry = ContextRegistry::new(engine);

        let result = registry.create_context("not json").unwrap();
        assert!(result.contains("Invalid config"));
    }

    #[test]
    fn test_invalid_utf8_result_is_released() {
        let engine = Arc::new(MockEngine::new().with_create_context_result(vec![0xff, 0xfe]));
        let registry = ContextRegistry::new(engine.clone());

        let err = registry.create_context("{}").unwrap_err();

        assert!(matches!(err, BridgeError::Encoding(_)));
        assert_eq!(engine.strings_released(), 1);
    }

    #[test]
    fn test_destroy_context_is_forwarded() {
        let engine = Arc::new(MockEngine::new());
        let registry = ContextRegistry::new(engine.clone());

        registry.destroy_context(ContextHandle::new(4));

        assert_eq!(engine.destroyed_contexts(), vec![ContextHandle::new(4)]);
    }
}
