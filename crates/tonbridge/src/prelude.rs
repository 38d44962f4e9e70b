//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tonbridge::prelude::*;` to import all essential types.

// Bridge
pub use crate::{Bridge, BridgeConfig, ContextRegistry, request_sync};

// Dispatch
pub use crate::{CallbackDispatcher, DispatchOutcome, DispatchStats, DropReason};

// Shared vocabulary
pub use crate::{
    AppId, ContextHandle, Continuation, ContinuationError, ContinuationHandle, CorrelationKey,
    CorrelationToken, ResponseEvent, ResponseKind, ResponseRoute, continuation_fn,
};

// Runtime
pub use crate::{DetachedRuntime, ManagedRuntime};

// Errors
pub use crate::{BridgeError, BridgeResult};

#[cfg(feature = "native")]
pub use crate::NativeEngine;
