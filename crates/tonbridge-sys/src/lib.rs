//! Raw FFI bindings for the TON client engine.
//!
//! This crate declares the engine's C ABI exactly as the engine exports it.
//! Strings cross the boundary as pointer/length pairs ([`tc_string_data_t`])
//! without a trailing NUL; strings returned by the engine are opaque handles
//! ([`tc_string_handle_t`]) that must be read with [`tc_read_string`] and freed
//! with [`tc_destroy_string`] exactly once.
//!
//! Safe wrappers live in the `tonbridge` crate. The extern block is only
//! linked when the `link` feature is enabled.

#![allow(unsafe_code)]
#![allow(non_camel_case_types)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::ffi::{c_char, c_void};

/// Borrowed string passed to or received from the engine.
///
/// Valid only for the duration of the call that produced it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct tc_string_data_t {
    /// First byte, or null when `len` is zero.
    pub content: *const c_char,
    /// Length in bytes.
    pub len: u32,
}

impl tc_string_data_t {
    /// Borrow a Rust string for the duration of an engine call.
    ///
    /// Returns `None` if the string is too long for the engine's `u32`
    /// length field.
    #[must_use]
    pub fn try_borrowed(s: &str) -> Option<Self> {
        Some(Self {
            content: s.as_ptr().cast(),
            len: wire_len(s.len())?,
        })
    }

    /// View the bytes.
    ///
    /// # Safety
    ///
    /// `content` must point to `len` readable bytes that stay valid for the
    /// returned lifetime, or be null with `len == 0`.
    #[must_use]
    pub unsafe fn as_bytes<'a>(&self) -> &'a [u8] {
        if self.content.is_null() || self.len == 0 {
            return &[];
        }
        let len = usize::try_from(self.len).unwrap_or(usize::MAX);
        // SAFETY: upheld by the caller.
        unsafe { std::slice::from_raw_parts(self.content.cast::<u8>(), len) }
    }
}

/// A byte length as the engine carries it, or `None` past `u32::MAX`.
#[must_use]
pub fn wire_len(len: usize) -> Option<u32> {
    u32::try_from(len).ok()
}

/// Opaque engine-owned string.
#[repr(C)]
pub struct tc_string_handle_t {
    _private: [u8; 0],
}

/// Callback for requests identified by a `u32` request id.
pub type tc_response_handler_t = Option<
    unsafe extern "C" fn(
        request_id: u32,
        params_json: tc_string_data_t,
        response_type: u32,
        finished: bool,
    ),
>;

/// Callback for requests identified by an opaque pointer.
pub type tc_response_handler_ptr_t = Option<
    unsafe extern "C" fn(
        request_ptr: *mut c_void,
        params_json: tc_string_data_t,
        response_type: u32,
        finished: bool,
    ),
>;

#[cfg(feature = "link")]
#[link(name = "ton_client")]
unsafe extern "C" {
    /// Create a context from a JSON config; returns the JSON result.
    pub fn tc_create_context(config: tc_string_data_t) -> *const tc_string_handle_t;

    /// Destroy a context.
    pub fn tc_destroy_context(context: u32);

    /// Submit a request whose callbacks carry `request_id`.
    pub fn tc_request(
        context: u32,
        function_name: tc_string_data_t,
        function_params_json: tc_string_data_t,
        request_id: u32,
        response_handler: tc_response_handler_t,
    );

    /// Submit a request whose callbacks carry `request_ptr`.
    pub fn tc_request_ptr(
        context: u32,
        function_name: tc_string_data_t,
        function_params_json: tc_string_data_t,
        request_ptr: *mut c_void,
        response_handler: tc_response_handler_ptr_t,
    );

    /// Run a request to completion on the calling thread.
    pub fn tc_request_sync(
        context: u32,
        function_name: tc_string_data_t,
        function_params_json: tc_string_data_t,
    ) -> *const tc_string_handle_t;

    /// Borrow the contents of an engine string.
    pub fn tc_read_string(handle: *const tc_string_handle_t) -> tc_string_data_t;

    /// Free an engine string.
    pub fn tc_destroy_string(handle: *const tc_string_handle_t);
}
