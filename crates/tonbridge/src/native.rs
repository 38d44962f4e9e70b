//! [`Engine`] over the engine's shared library.

#![allow(unsafe_code)]

use tracing::trace;

use tonbridge_core::{
    BridgeError, BridgeResult, ContextHandle, Engine, EngineString, ResponseRoute, ResponseTarget,
};
use tonbridge_sys::{
    tc_create_context, tc_destroy_context, tc_destroy_string, tc_read_string, tc_request,
    tc_request_ptr, tc_request_sync, tc_string_handle_t,
};

use crate::ffi::{
    engine_str, token_to_ptr, tonbridge_application_handler, tonbridge_one_shot_handler,
    tonbridge_ptr_handler, tonbridge_unregister_handler,
};
use crate::global;

/// A string returned by the engine, freed with `tc_destroy_string` on drop.
struct NativeString {
    handle: *const tc_string_handle_t,
}

// SAFETY: the handle is an owned engine allocation with no thread affinity.
unsafe impl Send for NativeString {}

impl EngineString for NativeString {
    fn as_bytes(&self) -> &[u8] {
        if self.handle.is_null() {
            return &[];
        }
        // SAFETY: the handle is live until drop, and the engine keeps the
        // bytes it points to valid for as long as the handle is.
        unsafe { tc_read_string(self.handle).as_bytes() }
    }
}

impl Drop for NativeString {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            // SAFETY: the handle came from the engine and is freed once.
            unsafe { tc_destroy_string(self.handle) };
        }
    }
}

/// The native engine.
///
/// Engine callbacks carry no Rust state, so they reach the bridge through
/// the process-wide installation in [`crate::global`]; requests fail with
/// [`BridgeError::NotInstalled`] until a bridge is installed. The handler
/// in each [`ResponseTarget`] is not used.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine {
    numeric_ids: bool,
}

impl NativeEngine {
    /// Submit one-shot requests through `tc_request_ptr`, carrying the token
    /// as the request pointer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit one-shot requests through `tc_request` with the token as the
    /// numeric request id.
    #[must_use]
    pub fn with_numeric_ids(mut self) -> Self {
        self.numeric_ids = true;
        self
    }
}

impl Engine for NativeEngine {
    fn create_context(&self, config: &str) -> BridgeResult<Box<dyn EngineString>> {
        let config = engine_str(config)?;
        // SAFETY: the config borrow lives for the duration of the call.
        let handle = unsafe { tc_create_context(config) };
        Ok(Box::new(NativeString { handle }))
    }

    fn destroy_context(&self, context: ContextHandle) {
        // SAFETY: plain value call.
        unsafe { tc_destroy_context(context.get()) };
    }

    fn request(
        &self,
        context: ContextHandle,
        function: &str,
        params: &str,
        target: ResponseTarget,
    ) -> BridgeResult<()> {
        if !global::is_installed() {
            return Err(BridgeError::NotInstalled);
        }

        let function_name = engine_str(function)?;
        let params_json = engine_str(params)?;
        let id = target.request_id;
        trace!(%context, function, route = %target.route, id, "Submitting native request");

        // SAFETY: the string borrows live for the duration of each call, and
        // the handlers match the signatures the engine expects.
        unsafe {
            match target.route {
                ResponseRoute::OneShot if self.numeric_ids => tc_request(
                    context.get(),
                    function_name,
                    params_json,
                    id,
                    Some(tonbridge_one_shot_handler),
                ),
                ResponseRoute::OneShot => tc_request_ptr(
                    context.get(),
                    function_name,
                    params_json,
                    token_to_ptr(tonbridge_core::CorrelationToken::from_raw(id)),
                    Some(tonbridge_ptr_handler),
                ),
                ResponseRoute::Application => tc_request(
                    context.get(),
                    function_name,
                    params_json,
                    id,
                    Some(tonbridge_application_handler),
                ),
                ResponseRoute::Unregister => tc_request(
                    context.get(),
                    function_name,
                    params_json,
                    id,
                    Some(tonbridge_unregister_handler),
                ),
            }
        }
        Ok(())
    }

    fn request_sync(
        &self,
        context: ContextHandle,
        function: &str,
        params: &str,
    ) -> BridgeResult<Box<dyn EngineString>> {
        let function_name = engine_str(function)?;
        let params_json = engine_str(params)?;
        // SAFETY: the string borrows live for the duration of the call.
        let handle = unsafe { tc_request_sync(context.get(), function_name, params_json) };
        Ok(Box::new(NativeString { handle }))
    }
}
