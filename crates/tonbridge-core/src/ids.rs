//! Identifiers exchanged with the engine.
//!
//! All three are plain `u32` newtypes because that is what the engine's C ABI
//! carries. The bridge never interprets a [`ContextHandle`]; it only forwards it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque engine session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextHandle(u32);

impl ContextHandle {
    /// Wrap a raw handle returned by the engine.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw value passed back to the engine.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ContextHandle {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bridge-generated identifier for one in-flight asynchronous request.
///
/// Tokens are minted by the correlation table from a counter. They are never
/// derived from the address or identity of a continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(u32);

impl CorrelationToken {
    /// Rebuild a token from the request id echoed back by the engine.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw request id handed to the engine.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Caller-supplied key for a persistent (application-scoped) entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(u32);

impl AppId {
    /// Wrap a caller-supplied application id.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw value handed to the engine as the request id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for AppId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app:{}", self.0)
    }
}

/// Key of a correlation entry: one-shot token or persistent application id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorrelationKey {
    /// One-shot entry, removed by the terminal event.
    Token(CorrelationToken),
    /// Persistent entry, removed only by an explicit unregister.
    Application(AppId),
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(token) => write!(f, "token {token}"),
            Self::Application(app_id) => write!(f, "{app_id}"),
        }
    }
}

impl From<CorrelationToken> for CorrelationKey {
    fn from(token: CorrelationToken) -> Self {
        Self::Token(token)
    }
}

impl From<AppId> for CorrelationKey {
    fn from(app_id: AppId) -> Self {
        Self::Application(app_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_serialize_as_bare_integers() {
        let json = serde_json::to_string(&ContextHandle::new(3)).unwrap();
        assert_eq!(json, "3");

        let token: CorrelationToken = serde_json::from_str("42").unwrap();
        assert_eq!(token.get(), 42);
    }

    #[test]
    fn key_display_names_the_variant() {
        assert_eq!(
            CorrelationKey::from(CorrelationToken::from_raw(7)).to_string(),
            "token #7"
        );
        assert_eq!(CorrelationKey::from(AppId::new(5)).to_string(), "app:5");
    }
}
