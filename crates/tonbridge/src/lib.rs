//! tonbridge - Asynchronous call-correlation bridge between a managed
//! runtime and the TON client engine.
//!
//! The engine runs requests on its own worker threads and reports results
//! through callbacks that may arrive on any thread, any number of times per
//! request. This crate pairs every callback with the continuation that
//! issued the request and runs it with the thread attached to the managed
//! runtime.
//!
//! # Architecture
//!
//! - [`ContextRegistry`] forwards context creation and destruction.
//! - [`Bridge`] submits requests, registering their continuations in the
//!   [`CorrelationTable`] first.
//! - [`CallbackDispatcher`] resolves each callback, attaches the thread,
//!   and invokes the continuation outside the table lock.
//! - [`request_sync`] runs a request on the calling thread.
//! - [`global`] and [`ffi`] connect the native engine's C callbacks to an
//!   installed bridge. [`NativeEngine`] is available with the `native`
//!   feature.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use tonbridge::prelude::*;
//! use tonbridge_test::{MockEngine, MockReply, MockRuntime, recording, test_context};
//!
//! let engine = Arc::new(MockEngine::new().with_replies(vec![
//!     MockReply::partial(r#"{"progress":50}"#),
//!     MockReply::finished(r#"{"result":"done"}"#),
//! ]));
//! let bridge = Bridge::with_defaults(engine, Arc::new(MockRuntime::new()));
//!
//! let (continuation, log) = recording();
//! let token = bridge
//!     .request_async(test_context(), "net.query", "{}", continuation)
//!     .unwrap();
//!
//! assert_eq!(log.payloads(), [r#"{"progress":50}"#, r#"{"result":"done"}"#]);
//! assert!(!bridge.table().contains_token(token));
//! ```
//!
//! [`CorrelationTable`]: tonbridge_correlation::CorrelationTable

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod ffi;
pub mod global;
pub mod prelude;

mod bridge;
mod context;
mod dispatcher;
#[cfg(feature = "native")]
mod native;
mod sync;

pub use bridge::Bridge;
pub use context::ContextRegistry;
pub use dispatcher::{CallbackDispatcher, DispatchOutcome, DispatchStats, DropReason};
#[cfg(feature = "native")]
pub use native::NativeEngine;
pub use sync::request_sync;

pub use tonbridge_config::BridgeConfig;
pub use tonbridge_core::{
    AppId, BridgeError, BridgeResult, ContextHandle, Continuation, ContinuationError,
    ContinuationHandle, CorrelationKey, CorrelationToken, Engine, ResponseEvent, ResponseKind,
    ResponseRoute, continuation_fn,
};
pub use tonbridge_correlation::CorrelationTable;
pub use tonbridge_runtime::{AttachStats, DetachedRuntime, ManagedRuntime};
