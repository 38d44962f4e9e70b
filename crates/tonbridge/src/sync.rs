//! Blocking requests.

use tracing::debug;

use tonbridge_core::{BridgeResult, ContextHandle, Engine, decode_payload};

/// Run `function` to completion on the calling thread.
///
/// No correlation entry is created. The engine-owned result is read into an
/// owned string and released exactly once, whether or not it decodes.
///
/// # Errors
///
/// Returns [`BridgeError::Encoding`](tonbridge_core::BridgeError::Encoding)
/// if the result is not valid UTF-8, or the engine's error if the request
/// could not be handed to it.
pub fn request_sync(
    engine: &dyn Engine,
    context: ContextHandle,
    function: &str,
    params: &str,
) -> BridgeResult<String> {
    debug!(%context, function, "Sync request");
    let result = engine.request_sync(context, function, params)?;
    decode_payload(result.as_bytes())
}
