//! Mock engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use tonbridge_core::{
    BridgeError, BridgeResult, ContextHandle, Engine, EngineString, ResponseKind, ResponseTarget,
};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One callback the mock engine sends for every accepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockReply {
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Response type code.
    pub kind: ResponseKind,
    /// Finished flag.
    pub finished: bool,
}

impl MockReply {
    /// A non-terminal success event.
    #[must_use]
    pub fn partial(payload: &str) -> Self {
        Self {
            payload: payload.as_bytes().to_vec(),
            kind: ResponseKind::SUCCESS,
            finished: false,
        }
    }

    /// A terminal success event.
    #[must_use]
    pub fn finished(payload: &str) -> Self {
        Self {
            payload: payload.as_bytes().to_vec(),
            kind: ResponseKind::SUCCESS,
            finished: true,
        }
    }

    /// A terminal engine error.
    #[must_use]
    pub fn error(payload: &str) -> Self {
        Self {
            payload: payload.as_bytes().to_vec(),
            kind: ResponseKind::ERROR,
            finished: true,
        }
    }

    /// Override the response type code.
    #[must_use]
    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Override the payload with raw bytes.
    #[must_use]
    pub fn with_raw_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }
}

/// A request the mock engine received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Target context.
    pub context: ContextHandle,
    /// Function name.
    pub function: String,
    /// Parameters JSON.
    pub params: String,
    /// Callback target (`None` for sync requests).
    pub target: Option<ResponseTarget>,
}

/// Engine-owned string that counts its releases.
#[derive(Debug)]
pub struct MockString {
    bytes: Vec<u8>,
    released: Arc<AtomicUsize>,
}

impl EngineString for MockString {
    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for MockString {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory [`Engine`] that records calls and replays scripted callbacks.
///
/// Scripted replies are delivered inline before `request` returns, or on a
/// fresh thread per request with [`with_threaded_replies`](Self::with_threaded_replies).
#[derive(Debug, Default)]
pub struct MockEngine {
    create_context_result: Mutex<Vec<u8>>,
    sync_result: Mutex<Vec<u8>>,
    replies: Mutex<Vec<MockReply>>,
    threaded: bool,
    rejection: Mutex<Option<String>>,
    requests: Mutex<Vec<RecordedRequest>>,
    sync_requests: Mutex<Vec<RecordedRequest>>,
    created_configs: Mutex<Vec<String>>,
    destroyed: Mutex<Vec<ContextHandle>>,
    released: Arc<AtomicUsize>,
    reply_threads: Mutex<Vec<JoinHandle<()>>>,
}

impl MockEngine {
    /// Create a mock engine with no scripted replies.
    #[must_use]
    pub fn new() -> Self {
        Self {
            create_context_result: Mutex::new(br#"{"result":1}"#.to_vec()),
            sync_result: Mutex::new(br#"{"result":{}}"#.to_vec()),
            ..Self::default()
        }
    }

    /// Bytes returned by `create_context`.
    #[must_use]
    pub fn with_create_context_result(self, result: Vec<u8>) -> Self {
        *lock(&self.create_context_result) = result;
        self
    }

    /// Bytes returned by `request_sync`.
    #[must_use]
    pub fn with_sync_result(self, result: Vec<u8>) -> Self {
        *lock(&self.sync_result) = result;
        self
    }

    /// Callbacks to send, in order, for every accepted request.
    #[must_use]
    pub fn with_replies(self, replies: Vec<MockReply>) -> Self {
        *lock(&self.replies) = replies;
        self
    }

    /// Deliver scripted replies on a new thread per request.
    #[must_use]
    pub fn with_threaded_replies(mut self) -> Self {
        self.threaded = true;
        self
    }

    /// Refuse every asynchronous request with this message.
    #[must_use]
    pub fn rejecting(self, message: impl Into<String>) -> Self {
        *lock(&self.rejection) = Some(message.into());
        self
    }

    /// Asynchronous requests received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Number of asynchronous requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Synchronous requests received, in order.
    #[must_use]
    pub fn sync_requests(&self) -> Vec<RecordedRequest> {
        lock(&self.sync_requests).clone()
    }

    /// Configs passed to `create_context`.
    #[must_use]
    pub fn created_configs(&self) -> Vec<String> {
        lock(&self.created_configs).clone()
    }

    /// Contexts passed to `destroy_context`.
    #[must_use]
    pub fn destroyed_contexts(&self) -> Vec<ContextHandle> {
        lock(&self.destroyed).clone()
    }

    /// Engine strings dropped so far.
    #[must_use]
    pub fn strings_released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Callback target of the `index`-th asynchronous request.
    #[must_use]
    pub fn target(&self, index: usize) -> Option<ResponseTarget> {
        lock(&self.requests)
            .get(index)
            .and_then(|request| request.target.clone())
    }

    /// Callback target of the most recent asynchronous request.
    #[must_use]
    pub fn last_target(&self) -> Option<ResponseTarget> {
        lock(&self.requests)
            .last()
            .and_then(|request| request.target.clone())
    }

    /// Send one callback for the `index`-th request on the calling thread.
    ///
    /// Returns `false` if there is no such request.
    pub fn deliver(&self, index: usize, payload: &[u8], kind: ResponseKind, finished: bool) -> bool {
        match self.target(index) {
            Some(target) => {
                target.deliver(payload, kind, finished);
                true
            },
            None => false,
        }
    }

    /// Wait for every reply thread spawned so far.
    pub fn join_reply_threads(&self) {
        let handles: Vec<_> = lock(&self.reply_threads).drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }

    fn engine_string(&self, bytes: Vec<u8>) -> Box<dyn EngineString> {
        Box::new(MockString {
            bytes,
            released: Arc::clone(&self.released),
        })
    }
}

impl Engine for MockEngine {
    fn create_context(&self, config: &str) -> BridgeResult<Box<dyn EngineString>> {
        lock(&self.created_configs).push(config.to_owned());
        let result = lock(&self.create_context_result).clone();
        Ok(self.engine_string(result))
    }

    fn destroy_context(&self, context: ContextHandle) {
        lock(&self.destroyed).push(context);
    }

    fn request(
        &self,
        context: ContextHandle,
        function: &str,
        params: &str,
        target: ResponseTarget,
    ) -> BridgeResult<()> {
        if let Some(message) = lock(&self.rejection).clone() {
            return Err(BridgeError::Submission(message));
        }

        lock(&self.requests).push(RecordedRequest {
            context,
            function: function.to_owned(),
            params: params.to_owned(),
            target: Some(target.clone()),
        });

        let replies = lock(&self.replies).clone();
        if replies.is_empty() {
            return Ok(());
        }

        let send = move || {
            for reply in replies {
                target.deliver(&reply.payload, reply.kind, reply.finished);
            }
        };
        if self.threaded {
            lock(&self.reply_threads).push(std::thread::spawn(send));
        } else {
            send();
        }
        Ok(())
    }

    fn request_sync(
        &self,
        context: ContextHandle,
        function: &str,
        params: &str,
    ) -> BridgeResult<Box<dyn EngineString>> {
        lock(&self.sync_requests).push(RecordedRequest {
            context,
            function: function.to_owned(),
            params: params.to_owned(),
            target: None,
        });
        let result = lock(&self.sync_result).clone();
        Ok(self.engine_string(result))
    }
}
