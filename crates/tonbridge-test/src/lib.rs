//! tonbridge Test - Shared test utilities for the engine bridge.
//!
//! This crate provides mock implementations of both sides of the bridge and
//! a few fixtures, for use as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! tonbridge-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use tonbridge_test::{MockEngine, MockReply, MockRuntime, recording};
//!
//! let engine = Arc::new(
//!     MockEngine::new().with_replies(vec![MockReply::partial("{}"), MockReply::finished("{}")]),
//! );
//! let runtime = Arc::new(MockRuntime::new());
//! let (continuation, log) = recording();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod continuation;
pub mod engine;
pub mod fixtures;
pub mod runtime;

pub use continuation::*;
pub use engine::*;
pub use fixtures::*;
pub use runtime::*;
