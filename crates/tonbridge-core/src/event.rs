//! Response events delivered to continuations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Response type code attached by the engine to every callback.
///
/// The bridge forwards the code untouched. The associated constants name the
/// codes the engine documents; anything at or above [`ResponseKind::CUSTOM`]
/// belongs to the function that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseKind(u32);

impl ResponseKind {
    /// Successful result.
    pub const SUCCESS: Self = Self(0);
    /// Engine-side failure; the payload carries the engine's error object.
    pub const ERROR: Self = Self(1);
    /// No-op keepalive event.
    pub const NOP: Self = Self(2);
    /// The engine asks the application for data.
    pub const APP_REQUEST: Self = Self(3);
    /// The engine notifies the application.
    pub const APP_NOTIFY: Self = Self(4);
    /// First function-defined code.
    pub const CUSTOM: Self = Self(100);

    /// Wrap a raw response type.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw code.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether the engine marked this event as a failure.
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 == Self::ERROR.0
    }

    /// Whether the code is function-defined.
    #[must_use]
    pub const fn is_custom(self) -> bool {
        self.0 >= Self::CUSTOM.0
    }
}

impl From<u32> for ResponseKind {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::SUCCESS => f.write_str("success"),
            Self::ERROR => f.write_str("error"),
            Self::NOP => f.write_str("nop"),
            Self::APP_REQUEST => f.write_str("app_request"),
            Self::APP_NOTIFY => f.write_str("app_notify"),
            Self(raw) => write!(f, "custom({raw})"),
        }
    }
}

/// One callback from the engine, after the payload has been copied out of
/// engine-owned memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEvent {
    /// Response type code.
    pub kind: ResponseKind,
    /// Response JSON text, owned by the bridge.
    pub payload: String,
    /// No further events follow for this request.
    pub finished: bool,
}

impl ResponseEvent {
    /// Build an event.
    #[must_use]
    pub fn new(kind: ResponseKind, payload: impl Into<String>, finished: bool) -> Self {
        Self {
            kind,
            payload: payload.into(),
            finished,
        }
    }
}
