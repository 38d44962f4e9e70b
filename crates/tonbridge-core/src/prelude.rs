//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tonbridge_core::prelude::*;` to import all essential types.

// Identifiers
pub use crate::{AppId, ContextHandle, CorrelationKey, CorrelationToken};

// Events
pub use crate::{ResponseEvent, ResponseKind};

// Managed-runtime side
pub use crate::{Continuation, ContinuationError, ContinuationHandle, continuation_fn};

// Engine side
pub use crate::{Engine, EngineString, ResponseHandler, ResponseRoute, ResponseTarget};

// Errors
pub use crate::{BridgeError, BridgeResult};
