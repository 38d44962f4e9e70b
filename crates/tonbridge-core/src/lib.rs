//! tonbridge Core - Shared vocabulary for the engine bridge.
//!
//! This crate provides:
//! - Identifiers that cross the engine boundary ([`ContextHandle`],
//!   [`CorrelationToken`], [`AppId`])
//! - The response event delivered to continuations ([`ResponseEvent`])
//! - The managed-runtime side contract ([`Continuation`])
//! - The engine side contract ([`Engine`], [`EngineString`], [`ResponseHandler`])
//! - The error taxonomy shared by every bridge crate ([`BridgeError`])
//!
//! # Example
//!
//! ```
//! use tonbridge_core::{Continuation, ResponseEvent, ResponseKind, continuation_fn};
//!
//! let continuation = continuation_fn(|event: ResponseEvent| {
//!     assert_eq!(event.kind, ResponseKind::SUCCESS);
//!     Ok(())
//! });
//!
//! continuation
//!     .invoke_one_shot(ResponseEvent::new(ResponseKind::SUCCESS, "{}", true))
//!     .unwrap();
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod continuation;
mod engine;
mod error;
mod event;
mod ids;
mod payload;

pub use continuation::{
    Continuation, ContinuationError, ContinuationHandle, FnContinuation, continuation_fn,
};
pub use engine::{Engine, EngineString, ResponseHandler, ResponseRoute, ResponseTarget};
pub use error::{BridgeError, BridgeResult};
pub use event::{ResponseEvent, ResponseKind};
pub use ids::{AppId, ContextHandle, CorrelationKey, CorrelationToken};
pub use payload::decode_payload;
