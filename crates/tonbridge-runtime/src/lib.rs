//! tonbridge Runtime - Binds engine threads to the managed runtime.
//!
//! Engine callbacks arrive on threads the managed runtime has never seen.
//! Before a continuation can run, the thread must be attached to the
//! runtime; afterwards it must be detached, but only if this bridge did the
//! attaching. [`ThreadBridge`] does both through an RAII [`AttachGuard`], so
//! the detach happens on every exit path, including unwinding.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tonbridge_runtime::{DetachedRuntime, ThreadBridge};
//!
//! let bridge = ThreadBridge::new(Arc::new(DetachedRuntime));
//! let answer = bridge.with_runtime_attached(|| 42).unwrap();
//! assert_eq!(answer, 42);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod bridge;
mod error;
mod runtime;

pub use bridge::{AttachGuard, AttachStats, ThreadBridge};
pub use error::AttachError;
pub use runtime::{DetachedRuntime, ManagedRuntime};
