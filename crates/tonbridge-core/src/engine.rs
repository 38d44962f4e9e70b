//! The engine side of the bridge.
//!
//! The engine is opaque: it accepts requests, runs them on its own thread
//! pool, and reports results through callbacks on threads of its choosing.

use std::fmt;
use std::sync::Arc;

use crate::error::BridgeResult;
use crate::event::ResponseKind;
use crate::ids::ContextHandle;

/// A string owned by the engine.
///
/// The bridge reads the bytes and then drops the value; dropping is the
/// release. Implementations backed by engine memory free it in `Drop`.
pub trait EngineString: Send {
    /// The raw bytes of the string.
    fn as_bytes(&self) -> &[u8];
}

impl EngineString for String {
    fn as_bytes(&self) -> &[u8] {
        str::as_bytes(self)
    }
}

impl EngineString for Vec<u8> {
    fn as_bytes(&self) -> &[u8] {
        self
    }
}

/// How callbacks for a request must be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseRoute {
    /// The request id is a bridge-minted correlation token.
    OneShot,
    /// The request id is an application id with a persistent entry.
    Application,
    /// Like [`Application`](Self::Application), and the entry is removed
    /// after the continuation has seen the event.
    Unregister,
}

impl fmt::Display for ResponseRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneShot => f.write_str("one_shot"),
            Self::Application => f.write_str("application"),
            Self::Unregister => f.write_str("unregister"),
        }
    }
}

/// Receiver of engine callbacks.
///
/// Called on arbitrary engine threads, possibly concurrently. `payload` is
/// only valid for the duration of the call.
pub trait ResponseHandler: Send + Sync {
    /// Handle one engine callback.
    fn handle(
        &self,
        route: ResponseRoute,
        request_id: u32,
        payload: &[u8],
        kind: ResponseKind,
        finished: bool,
    );
}

/// Where the engine must deliver the callbacks of one request.
#[derive(Clone)]
pub struct ResponseTarget {
    /// Correlation route.
    pub route: ResponseRoute,
    /// Token or application id echoed back with every callback.
    pub request_id: u32,
    /// Handler to invoke.
    pub handler: Arc<dyn ResponseHandler>,
}

impl ResponseTarget {
    /// Build a target.
    #[must_use]
    pub fn new(route: ResponseRoute, request_id: u32, handler: Arc<dyn ResponseHandler>) -> Self {
        Self {
            route,
            request_id,
            handler,
        }
    }

    /// Deliver one callback to the handler.
    pub fn deliver(&self, payload: &[u8], kind: ResponseKind, finished: bool) {
        self.handler
            .handle(self.route, self.request_id, payload, kind, finished);
    }
}

impl fmt::Debug for ResponseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseTarget")
            .field("route", &self.route)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

/// The request-processing engine.
pub trait Engine: Send + Sync {
    /// Create a context. The returned string is the engine's JSON result,
    /// success or error, which the bridge passes through verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the config could not be handed to the engine.
    fn create_context(&self, config: &str) -> BridgeResult<Box<dyn EngineString>>;

    /// Destroy a context. Callbacks already in flight may still arrive.
    fn destroy_context(&self, context: ContextHandle);

    /// Submit an asynchronous request. Returns once the engine has accepted
    /// it; results arrive later through `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be handed to the engine.
    fn request(
        &self,
        context: ContextHandle,
        function: &str,
        params: &str,
        target: ResponseTarget,
    ) -> BridgeResult<()>;

    /// Run a request to completion on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be handed to the engine.
    fn request_sync(
        &self,
        context: ContextHandle,
        function: &str,
        params: &str,
    ) -> BridgeResult<Box<dyn EngineString>>;
}
