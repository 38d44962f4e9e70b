//! Payload conversion between engine bytes and runtime text.

use crate::error::BridgeResult;

/// Copy an engine payload into an owned string.
///
/// The engine owns `bytes` only for the duration of its callback, so the
/// result never borrows from it. Every byte is kept, including interior NULs.
///
/// # Errors
///
/// Returns [`BridgeError::Encoding`](crate::BridgeError::Encoding) if the
/// bytes are not UTF-8.
pub fn decode_payload(bytes: &[u8]) -> BridgeResult<String> {
    Ok(std::str::from_utf8(bytes)?.to_owned())
}
