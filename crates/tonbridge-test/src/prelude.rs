//! Prelude module - commonly used test utilities.
//!
//! Use `use tonbridge_test::prelude::*;` in test modules.

pub use crate::{
    EventLog, MockEngine, MockReply, MockRuntime, RecordedEvent, RecordedRequest,
    RecordingContinuation, init_test_logging, recording, test_context,
};
