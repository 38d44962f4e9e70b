//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tonbridge_telemetry::prelude::*;` to import all essential types.

// Logging setup
pub use crate::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};

// Dispatch tracing
pub use crate::{DispatchContext, DispatchGuard};

// Errors
pub use crate::{TelemetryError, TelemetryResult};
