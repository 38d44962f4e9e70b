//! tonbridge Correlation - Tracks which continuation belongs to which
//! in-flight engine request.
//!
//! The [`CorrelationTable`] is the only shared mutable state of the bridge.
//! It holds two kinds of entries:
//! - **One-shot** entries, keyed by a bridge-minted [`CorrelationToken`],
//!   removed by the first event that carries `finished = true`.
//! - **Persistent** entries, keyed by a caller-supplied [`AppId`], removed
//!   only by an explicit [`unregister`](CorrelationTable::unregister).
//!
//! Every lookup is an explicit try-resolve that fails with
//! [`CorrelationError::NotFound`]; the table never materializes a default
//! entry for an unknown key.
//!
//! # Example
//!
//! ```
//! use tonbridge_core::{ResponseEvent, continuation_fn};
//! use tonbridge_correlation::CorrelationTable;
//!
//! let table = CorrelationTable::new();
//! let token = table.register(continuation_fn(|_: ResponseEvent| Ok(()))).unwrap();
//!
//! // Streaming events leave the entry in place.
//! assert!(!table.resolve(token, false).unwrap().is_retired());
//! // The terminal event removes it.
//! assert!(table.resolve(token, true).unwrap().is_retired());
//! assert!(table.resolve(token, true).is_err());
//! ```
//!
//! [`CorrelationToken`]: tonbridge_core::CorrelationToken
//! [`AppId`]: tonbridge_core::AppId

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod entry;
mod error;
mod table;

pub use entry::{CorrelationEntry, RequestOrigin, Resolved};
pub use error::{CorrelationError, CorrelationResult};
pub use table::CorrelationTable;
