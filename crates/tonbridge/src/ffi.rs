//! C ABI entry points handed to the native engine.
//!
//! Each trampoline copies nothing itself; it borrows the engine's payload
//! for the duration of the call and lets the dispatcher copy it. Panics are
//! caught here and never unwind into the engine.

#![allow(unsafe_code)]

use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, warn};

use tonbridge_core::{BridgeError, BridgeResult, CorrelationToken, ResponseKind, ResponseRoute};
use tonbridge_sys::tc_string_data_t;

use crate::dispatcher::panic_message;
use crate::global;

/// Encode a token as the opaque request pointer of `tc_request_ptr`.
///
/// The pointer is an integer, never the address of bridge memory.
#[must_use]
pub fn token_to_ptr(token: CorrelationToken) -> *mut c_void {
    std::ptr::without_provenance_mut(usize::try_from(token.get()).unwrap_or_default())
}

/// Decode a request pointer produced by [`token_to_ptr`].
///
/// Returns `None` for values outside the token range.
#[must_use]
pub fn token_from_ptr(ptr: *mut c_void) -> Option<CorrelationToken> {
    u32::try_from(ptr.addr())
        .ok()
        .filter(|raw| *raw != 0)
        .map(CorrelationToken::from_raw)
}

/// Borrow `s` for the duration of an engine call.
///
/// # Errors
///
/// Returns [`BridgeError::PayloadTooLarge`] if `s` does not fit the engine's
/// `u32` length field. Nothing is ever truncated.
pub fn engine_str(s: &str) -> BridgeResult<tc_string_data_t> {
    tc_string_data_t::try_borrowed(s).ok_or(BridgeError::PayloadTooLarge { len: s.len() })
}

/// Callback for one-shot requests submitted with a numeric request id.
///
/// # Safety
///
/// `params_json` must be readable for the duration of the call.
pub unsafe extern "C" fn tonbridge_one_shot_handler(
    request_id: u32,
    params_json: tc_string_data_t,
    response_type: u32,
    finished: bool,
) {
    // SAFETY: forwarded from the caller.
    unsafe {
        route_callback(
            ResponseRoute::OneShot,
            request_id,
            params_json,
            response_type,
            finished,
        );
    }
}

/// Callback for requests submitted under an application id.
///
/// # Safety
///
/// `params_json` must be readable for the duration of the call.
pub unsafe extern "C" fn tonbridge_application_handler(
    request_id: u32,
    params_json: tc_string_data_t,
    response_type: u32,
    finished: bool,
) {
    // SAFETY: forwarded from the caller.
    unsafe {
        route_callback(
            ResponseRoute::Application,
            request_id,
            params_json,
            response_type,
            finished,
        );
    }
}

/// Callback for the request that unregisters an application id.
///
/// # Safety
///
/// `params_json` must be readable for the duration of the call.
pub unsafe extern "C" fn tonbridge_unregister_handler(
    request_id: u32,
    params_json: tc_string_data_t,
    response_type: u32,
    finished: bool,
) {
    // SAFETY: forwarded from the caller.
    unsafe {
        route_callback(
            ResponseRoute::Unregister,
            request_id,
            params_json,
            response_type,
            finished,
        );
    }
}

/// Callback for one-shot requests submitted with `tc_request_ptr`.
///
/// # Safety
///
/// `params_json` must be readable for the duration of the call.
/// `request_ptr` is never dereferenced.
pub unsafe extern "C" fn tonbridge_ptr_handler(
    request_ptr: *mut c_void,
    params_json: tc_string_data_t,
    response_type: u32,
    finished: bool,
) {
    let Some(token) = token_from_ptr(request_ptr) else {
        warn!(addr = request_ptr.addr(), "Dropping callback with invalid request pointer");
        return;
    };
    // SAFETY: forwarded from the caller.
    unsafe {
        route_callback(
            ResponseRoute::OneShot,
            token.get(),
            params_json,
            response_type,
            finished,
        );
    }
}

/// # Safety
///
/// `params_json` must be readable for the duration of the call.
unsafe fn route_callback(
    route: ResponseRoute,
    request_id: u32,
    params_json: tc_string_data_t,
    response_type: u32,
    finished: bool,
) {
    // SAFETY: upheld by the caller; the slice does not outlive this call.
    let payload = unsafe { params_json.as_bytes() };

    let result = panic::catch_unwind(AssertUnwindSafe(|| match global::installed() {
        Some(bridge) => {
            bridge.dispatch(
                route,
                request_id,
                payload,
                ResponseKind::new(response_type),
                finished,
            );
        },
        None => warn!(%route, request_id, "No bridge installed, dropping engine callback"),
    }));

    if let Err(panic) = result {
        error!(
            %route,
            request_id,
            message = panic_message(panic.as_ref()),
            "Panic while handling engine callback"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_pointer_round_trip() {
        for raw in [1, 7, 65_536, u32::MAX] {
            let token = CorrelationToken::from_raw(raw);
            assert_eq!(token_from_ptr(token_to_ptr(token)), Some(token));
        }
    }

    #[test]
    fn test_engine_str_borrows_without_copying() {
        let params = r#"{"ok":true}"#;
        let data = engine_str(params).unwrap();
        assert_eq!(data.len, 11);
        assert_eq!(data.content.cast::<u8>(), params.as_ptr());
    }

    #[test]
    fn test_engine_str_accepts_empty_string() {
        assert_eq!(engine_str("").unwrap().len, 0);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_payload_too_large_reports_length() {
        let err = BridgeError::PayloadTooLarge { len: 4_294_967_296 };
        assert_eq!(
            err.to_string(),
            "string of 4294967296 bytes exceeds the engine's length limit"
        );
    }

    #[test]
    fn test_null_pointer_is_not_a_token() {
        assert_eq!(token_from_ptr(std::ptr::null_mut()), None);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_out_of_range_pointer_is_rejected() {
        let ptr = std::ptr::without_provenance_mut(0x100_0000_0000_usize);
        assert_eq!(token_from_ptr(ptr), None);
    }
}
