//! Shared harness for integration tests.

use std::sync::Arc;

use tonbridge::{Bridge, BridgeConfig};
use tonbridge_test::{MockEngine, MockRuntime, init_test_logging};

/// A bridge wired to a mock engine and a mock runtime.
#[allow(dead_code)]
pub struct BridgeHarness {
    /// The bridge under test.
    pub bridge: Arc<Bridge>,
    /// The engine the bridge submits to.
    pub engine: Arc<MockEngine>,
    /// The runtime threads are attached to.
    pub runtime: Arc<MockRuntime>,
}

#[allow(dead_code)]
impl BridgeHarness {
    /// Harness with default configuration and an engine that never replies.
    pub fn new() -> Self {
        Self::with_engine(MockEngine::new())
    }

    /// Harness over a preconfigured engine.
    pub fn with_engine(engine: MockEngine) -> Self {
        Self::with_config(engine, &BridgeConfig::default())
    }

    /// Harness over a preconfigured engine and configuration.
    pub fn with_config(engine: MockEngine, config: &BridgeConfig) -> Self {
        init_test_logging();
        let engine = Arc::new(engine);
        let runtime = Arc::new(MockRuntime::new());
        let bridge = Arc::new(Bridge::new(engine.clone(), runtime.clone(), config));
        Self {
            bridge,
            engine,
            runtime,
        }
    }

    /// Every attach was matched by a detach, and no thread is left attached.
    pub fn assert_attach_balanced(&self) {
        assert!(self.bridge.attach_stats().is_balanced());
        assert_eq!(self.runtime.attach_calls(), self.runtime.detach_calls());
        assert_eq!(self.runtime.attached_count(), 0);
    }
}
