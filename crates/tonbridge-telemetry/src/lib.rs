//! tonbridge Telemetry - Logging and dispatch tracing for the engine bridge.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - A per-callback dispatch context whose span ties together every log line
//!   emitted while one engine callback is handled
//!
//! # Example
//!
//! ```rust,no_run
//! use tonbridge_telemetry::{DispatchContext, DispatchGuard, LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), tonbridge_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Json)
//!     .with_directive("tonbridge_correlation=trace");
//!
//! setup_logging(&config)?;
//!
//! let _guard = DispatchGuard::new(DispatchContext::new("one_shot", 7).with_finished(true));
//! tracing::info!("Handling callback");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{DispatchContext, DispatchGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
