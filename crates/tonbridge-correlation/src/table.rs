//! The correlation table.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, trace, warn};

use tonbridge_core::{AppId, ContinuationHandle, CorrelationKey, CorrelationToken};

use crate::entry::{CorrelationEntry, RequestOrigin, Resolved};
use crate::error::{CorrelationError, CorrelationResult};

/// Token value never handed out, so a zeroed request id from the engine can
/// never alias a live entry.
const RESERVED_TOKEN: u32 = 0;

/// Number of distinct tokens the table can mint.
fn token_space() -> usize {
    usize::try_from(u32::MAX).unwrap_or(usize::MAX)
}

struct TableState {
    one_shot: HashMap<CorrelationToken, CorrelationEntry>,
    applications: HashMap<AppId, CorrelationEntry>,
    next_token: u32,
}

impl TableState {
    /// Mint a token that is not currently live.
    ///
    /// The counter wraps, so a long-running process eventually revisits old
    /// values; live ones and the reserved zero are skipped.
    fn allocate_token(&mut self) -> CorrelationResult<CorrelationToken> {
        if self.one_shot.len() >= token_space() {
            return Err(CorrelationError::TokenSpaceExhausted);
        }

        loop {
            let candidate = self.next_token;
            self.next_token = self.next_token.wrapping_add(1);

            if candidate == RESERVED_TOKEN {
                continue;
            }
            let token = CorrelationToken::from_raw(candidate);
            if !self.one_shot.contains_key(&token) {
                return Ok(token);
            }
            trace!(%token, "Skipping live token after counter wraparound");
        }
    }
}

/// Thread-safe map from request ids to pinned continuations.
///
/// A single [`Mutex`] guards all state. It is held only while maps are read
/// or mutated; continuations are never invoked and never dropped while it is
/// held, so a continuation may re-enter the table freely.
pub struct CorrelationTable {
    state: Mutex<TableState>,
    /// Maximum live one-shot entries (0 = unlimited).
    max_live_entries: usize,
}

impl CorrelationTable {
    /// Create an empty table with no entry limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TableState {
                one_shot: HashMap::new(),
                applications: HashMap::new(),
                next_token: 1,
            }),
            max_live_entries: 0,
        }
    }

    /// Limit the number of live one-shot entries (0 = unlimited).
    #[must_use]
    pub fn with_max_live_entries(mut self, limit: usize) -> Self {
        self.max_live_entries = limit;
        self
    }

    /// Start minting tokens at `first`. Zero is never minted.
    #[must_use]
    pub fn with_first_token(self, first: u32) -> Self {
        self.lock().next_token = first;
        self
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(|e| {
            warn!("Correlation table lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Register a one-shot continuation and return its fresh token.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::CapacityExceeded`] if the live-entry limit
    /// is reached, or [`CorrelationError::TokenSpaceExhausted`] if every token
    /// value is live.
    pub fn register(&self, continuation: ContinuationHandle) -> CorrelationResult<CorrelationToken> {
        self.insert_one_shot(continuation, None)
    }

    /// Register a one-shot continuation, recording the request that owns it.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn register_with_origin(
        &self,
        continuation: ContinuationHandle,
        origin: RequestOrigin,
    ) -> CorrelationResult<CorrelationToken> {
        self.insert_one_shot(continuation, Some(origin))
    }

    fn insert_one_shot(
        &self,
        continuation: ContinuationHandle,
        origin: Option<RequestOrigin>,
    ) -> CorrelationResult<CorrelationToken> {
        let mut state = self.lock();

        if self.max_live_entries > 0 && state.one_shot.len() >= self.max_live_entries {
            return Err(CorrelationError::CapacityExceeded {
                limit: self.max_live_entries,
            });
        }

        let token = state.allocate_token()?;
        state.one_shot.insert(
            token,
            CorrelationEntry::new(CorrelationKey::Token(token), continuation, origin),
        );
        debug!(%token, live = state.one_shot.len(), "Registered one-shot continuation");
        Ok(token)
    }

    /// Store the persistent continuation for `app_id`.
    ///
    /// Last write wins: an existing continuation for the same id is replaced
    /// and will not be notified again. The replaced continuation is returned
    /// so the caller decides where it is released.
    pub fn register_for_application(
        &self,
        app_id: AppId,
        continuation: ContinuationHandle,
    ) -> Option<ContinuationHandle> {
        let previous = {
            let mut state = self.lock();
            state.applications.insert(
                app_id,
                CorrelationEntry::new(CorrelationKey::Application(app_id), continuation, None),
            )
        };

        match previous {
            Some(entry) => {
                warn!(
                    %app_id,
                    "Replaced persistent continuation; the previous one will not be notified again"
                );
                Some(entry.into_continuation())
            },
            None => {
                debug!(%app_id, "Registered persistent continuation");
                None
            },
        }
    }

    /// Resolve a one-shot token for an event.
    ///
    /// A non-terminal event gets a clone of the continuation and leaves the
    /// entry in place. A terminal event removes the entry atomically and
    /// hands it over.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::NotFound`] if the token is not live.
    pub fn resolve(&self, token: CorrelationToken, finished: bool) -> CorrelationResult<Resolved> {
        if finished {
            return self.resolve_and_remove(token).map(Resolved::Retired);
        }

        let continuation = self.peek(token)?;
        trace!(%token, "Resolved streaming event");
        Ok(Resolved::Streaming(continuation))
    }

    /// Look up and remove a one-shot entry in one step.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::NotFound`] if the token is not live.
    pub fn resolve_and_remove(&self, token: CorrelationToken) -> CorrelationResult<CorrelationEntry> {
        let mut state = self.lock();
        let entry = state
            .one_shot
            .remove(&token)
            .ok_or(CorrelationError::NotFound(CorrelationKey::Token(token)))?;
        debug!(%token, live = state.one_shot.len(), "Retired one-shot continuation");
        Ok(entry)
    }

    /// Look up a one-shot continuation without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::NotFound`] if the token is not live.
    pub fn peek(&self, token: CorrelationToken) -> CorrelationResult<ContinuationHandle> {
        self.lock()
            .one_shot
            .get(&token)
            .map(|entry| ContinuationHandle::clone(entry.continuation()))
            .ok_or(CorrelationError::NotFound(CorrelationKey::Token(token)))
    }

    /// Remove a one-shot entry whose request never reached the engine.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::NotFound`] if the token is not live.
    pub fn cancel(&self, token: CorrelationToken) -> CorrelationResult<CorrelationEntry> {
        let entry = self
            .lock()
            .one_shot
            .remove(&token)
            .ok_or(CorrelationError::NotFound(CorrelationKey::Token(token)))?;
        debug!(%token, "Cancelled one-shot continuation");
        Ok(entry)
    }

    /// Look up the persistent continuation for `app_id`. The entry stays.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::NotFound`] if no entry exists for the id.
    pub fn resolve_for_application(&self, app_id: AppId) -> CorrelationResult<ContinuationHandle> {
        self.lock()
            .applications
            .get(&app_id)
            .map(|entry| ContinuationHandle::clone(entry.continuation()))
            .ok_or(CorrelationError::NotFound(CorrelationKey::Application(app_id)))
    }

    /// Remove the persistent entry for `app_id`.
    ///
    /// The removed entry is returned; dropping it releases the table's
    /// reference to the continuation.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::NotFound`] if no entry exists for the id.
    pub fn unregister(&self, app_id: AppId) -> CorrelationResult<CorrelationEntry> {
        let entry = self
            .lock()
            .applications
            .remove(&app_id)
            .ok_or(CorrelationError::NotFound(CorrelationKey::Application(app_id)))?;
        debug!(%app_id, "Unregistered persistent continuation");
        Ok(entry)
    }

    /// Whether a one-shot token is live.
    #[must_use]
    pub fn contains_token(&self, token: CorrelationToken) -> bool {
        self.lock().one_shot.contains_key(&token)
    }

    /// Whether a persistent entry exists for `app_id`.
    #[must_use]
    pub fn contains_application(&self, app_id: AppId) -> bool {
        self.lock().applications.contains_key(&app_id)
    }

    /// Number of live one-shot entries.
    #[must_use]
    pub fn one_shot_len(&self) -> usize {
        self.lock().one_shot.len()
    }

    /// Number of persistent entries.
    #[must_use]
    pub fn application_len(&self) -> usize {
        self.lock().applications.len()
    }

    /// Total number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let state = self.lock();
        state.one_shot.len().saturating_add(state.applications.len())
    }

    /// Whether the table holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry, oldest first.
    ///
    /// Called at shutdown. Entries are returned rather than dropped here so
    /// the caller controls on which thread continuations are released.
    pub fn drain(&self) -> Vec<CorrelationEntry> {
        let (one_shot, applications) = {
            let mut state = self.lock();
            (
                std::mem::take(&mut state.one_shot),
                std::mem::take(&mut state.applications),
            )
        };

        let mut entries: Vec<CorrelationEntry> = one_shot
            .into_values()
            .chain(applications.into_values())
            .collect();
        entries.sort_by_key(|entry| std::cmp::Reverse(entry.age()));

        if !entries.is_empty() {
            debug!(count = entries.len(), "Drained correlation table");
        }
        entries
    }
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CorrelationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("CorrelationTable")
            .field("one_shot", &state.one_shot.len())
            .field("applications", &state.applications.len())
            .field("next_token", &state.next_token)
            .field("max_live_entries", &self.max_live_entries)
            .finish()
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
