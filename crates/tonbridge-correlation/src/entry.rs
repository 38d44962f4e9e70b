//! Correlation entries.

use std::fmt;
use std::time::{Duration, Instant};

use tonbridge_core::{ContextHandle, ContinuationHandle, CorrelationKey};

/// The request that created an entry. Only used for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    /// Context the request was issued against.
    pub context: ContextHandle,
    /// Engine function name.
    pub function: String,
}

impl RequestOrigin {
    /// Create an origin record.
    #[must_use]
    pub fn new(context: ContextHandle, function: impl Into<String>) -> Self {
        Self {
            context,
            function: function.into(),
        }
    }
}

/// A live correlation entry.
///
/// The entry pins its continuation. Dropping the entry releases the table's
/// reference; the continuation itself is released once the last clone handed
/// out for an in-progress dispatch is gone.
pub struct CorrelationEntry {
    key: CorrelationKey,
    continuation: ContinuationHandle,
    origin: Option<RequestOrigin>,
    registered_at: Instant,
}

impl CorrelationEntry {
    pub(crate) fn new(
        key: CorrelationKey,
        continuation: ContinuationHandle,
        origin: Option<RequestOrigin>,
    ) -> Self {
        Self {
            key,
            continuation,
            origin,
            registered_at: Instant::now(),
        }
    }

    /// The key this entry is stored under.
    #[must_use]
    pub fn key(&self) -> CorrelationKey {
        self.key
    }

    /// The pinned continuation.
    #[must_use]
    pub fn continuation(&self) -> &ContinuationHandle {
        &self.continuation
    }

    /// The request that created the entry, if recorded.
    #[must_use]
    pub fn origin(&self) -> Option<&RequestOrigin> {
        self.origin.as_ref()
    }

    /// Time since registration.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.registered_at.elapsed()
    }

    /// Time since registration in whole milliseconds, saturating.
    #[must_use]
    pub fn age_ms(&self) -> u64 {
        u64::try_from(self.age().as_millis()).unwrap_or(u64::MAX)
    }

    /// Consume the entry, keeping only the continuation.
    #[must_use]
    pub fn into_continuation(self) -> ContinuationHandle {
        self.continuation
    }
}

impl fmt::Debug for CorrelationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationEntry")
            .field("key", &self.key)
            .field("origin", &self.origin)
            .field("age", &self.age())
            .finish_non_exhaustive()
    }
}

/// Outcome of resolving a one-shot token.
pub enum Resolved {
    /// Non-terminal event: the entry stays in the table and the caller gets
    /// a clone of the continuation.
    Streaming(ContinuationHandle),
    /// Terminal event: the entry was removed and the caller now owns it.
    /// Dropping it releases the continuation.
    Retired(CorrelationEntry),
}

impl Resolved {
    /// The continuation to invoke.
    #[must_use]
    pub fn continuation(&self) -> &ContinuationHandle {
        match self {
            Self::Streaming(continuation) => continuation,
            Self::Retired(entry) => entry.continuation(),
        }
    }

    /// Whether the entry was removed by this resolution.
    #[must_use]
    pub fn is_retired(&self) -> bool {
        matches!(self, Self::Retired(_))
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Streaming(_) => f.write_str("Streaming"),
            Self::Retired(entry) => f.debug_tuple("Retired").field(entry).finish(),
        }
    }
}
