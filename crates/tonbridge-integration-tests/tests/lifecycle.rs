//! Entry lifecycles, continuation release, and re-entrancy.

mod common;

use std::sync::{Arc, Mutex};

use common::BridgeHarness;
use tonbridge::{
    AppId, Bridge, ContinuationError, DispatchOutcome, DropReason, ResponseKind, ResponseRoute,
    continuation_fn,
};
use tonbridge_test::{
    MockEngine, MockReply, RecordingContinuation, recording, recording_with_runtime, test_context,
};

#[test]
fn test_persistent_entry_survives_until_unregistered() {
    let harness = BridgeHarness::new();
    let app_id = AppId::new(40);
    let (subscriber, subscriber_log) = recording_with_runtime(harness.runtime.clone());

    harness
        .bridge
        .request_for_application(test_context(), "net.subscribe_collection", "{}", app_id, subscriber)
        .unwrap();
    for n in 0..5 {
        let payload = format!(r#"{{"n":{n}}}"#);
        let outcome = harness.bridge.dispatch(
            ResponseRoute::Application,
            app_id.get(),
            payload.as_bytes(),
            ResponseKind::APP_NOTIFY,
            true,
        );
        assert_eq!(outcome, DispatchOutcome::Delivered { retired: false });
    }
    assert_eq!(subscriber_log.len(), 5);
    assert!(harness.bridge.table().contains_application(app_id));

    let (closer, closer_log) = recording_with_runtime(harness.runtime.clone());
    harness
        .bridge
        .unregister_application(test_context(), "net.unsubscribe", "{}", app_id, closer)
        .unwrap();
    assert_eq!(subscriber_log.released(), 1);

    let outcome = harness.bridge.dispatch(
        ResponseRoute::Unregister,
        app_id.get(),
        b"{}",
        ResponseKind::SUCCESS,
        false,
    );
    assert_eq!(outcome, DispatchOutcome::Delivered { retired: true });
    assert_eq!(closer_log.len(), 1);
    assert_eq!(closer_log.released(), 1);
    assert_eq!(closer_log.released_while_attached(), 1);

    let late = harness.bridge.dispatch(
        ResponseRoute::Application,
        app_id.get(),
        b"{}",
        ResponseKind::APP_NOTIFY,
        true,
    );
    assert!(matches!(late, DispatchOutcome::Dropped(DropReason::NotFound(_))));
    harness.assert_attach_balanced();
}

#[test]
fn test_last_registration_wins() {
    let harness = BridgeHarness::new();
    let app_id = AppId::new(2);
    let (first, first_log) = recording();
    let (second, second_log) = recording();

    harness
        .bridge
        .request_for_application(test_context(), "net.subscribe", "{}", app_id, first)
        .unwrap();
    harness
        .bridge
        .request_for_application(test_context(), "net.subscribe", "{}", app_id, second)
        .unwrap();
    harness.engine.deliver(0, b"{}", ResponseKind::APP_NOTIFY, false);

    assert!(first_log.is_empty());
    assert_eq!(first_log.released(), 1);
    assert_eq!(second_log.len(), 1);
}

#[test]
fn test_continuation_released_exactly_once_on_every_path() {
    let harness = BridgeHarness::new();

    let (delivered, delivered_log) = recording();
    harness
        .bridge
        .request_async(test_context(), "a", "{}", delivered)
        .unwrap();
    harness.engine.deliver(0, b"{}", ResponseKind::SUCCESS, true);
    harness.engine.deliver(0, b"{}", ResponseKind::SUCCESS, true);

    let failing = RecordingContinuation::new().failing("rejected");
    let failing_log = failing.log();
    harness
        .bridge
        .request_async(test_context(), "b", "{}", Arc::new(failing))
        .unwrap();
    harness.engine.deliver(1, b"{}", ResponseKind::SUCCESS, true);

    let panicking = RecordingContinuation::new().panicking("boom");
    let panicking_log = panicking.log();
    harness
        .bridge
        .request_async(test_context(), "c", "{}", Arc::new(panicking))
        .unwrap();
    harness.engine.deliver(2, b"{}", ResponseKind::SUCCESS, true);

    let (leaked, leaked_log) = recording();
    harness
        .bridge
        .request_async(test_context(), "d", "{}", leaked)
        .unwrap();
    assert_eq!(harness.bridge.shutdown(), 1);

    for log in [&delivered_log, &failing_log, &panicking_log, &leaked_log] {
        assert_eq!(log.released(), 1);
    }
    assert_eq!(delivered_log.len(), 1);
    assert_eq!(harness.bridge.stats().continuation_failures, 2);
    assert!(harness.bridge.table().is_empty());
}

#[test]
fn test_refused_attach_drops_callback_and_releases() {
    let harness = BridgeHarness::new();
    let (continuation, log) = recording();
    harness
        .bridge
        .request_async(test_context(), "net.query", "{}", continuation)
        .unwrap();

    harness.runtime.set_refuse(true);
    let target = harness.engine.target(0).unwrap();
    target.deliver(b"{}", ResponseKind::SUCCESS, true);
    harness.runtime.set_refuse(false);

    assert!(log.is_empty());
    assert_eq!(log.released(), 1);
    assert!(harness.bridge.table().is_empty());
    assert_eq!(harness.bridge.stats().attach_failures, 1);
}

#[test]
fn test_continuation_can_reenter_bridge() {
    let harness = BridgeHarness::with_engine(
        MockEngine::new().with_replies(vec![MockReply::finished(r#"{"result":"ok"}"#)]),
    );
    let bridge: Arc<Bridge> = Arc::clone(&harness.bridge);
    let follow_ups = Arc::new(Mutex::new(Vec::new()));

    // The completion runs a synchronous request and then issues a follow-up.
    let chain = {
        let follow_ups = Arc::clone(&follow_ups);
        let bridge = Arc::downgrade(&bridge);
        continuation_fn(move |event| {
            follow_ups.lock().unwrap().push(event.payload);
            let Some(bridge) = bridge.upgrade() else {
                return Ok(());
            };
            let version = bridge
                .request_sync(test_context(), "client.version", "{}")
                .map_err(|e| ContinuationError::new(e.to_string()))?;
            let (next, _log) = recording();
            bridge
                .request_async(test_context(), "net.query", &version, next)
                .map_err(|e| ContinuationError::new(e.to_string()))?;
            Ok(())
        })
    };

    harness
        .bridge
        .request_async(test_context(), "net.query", "{}", chain)
        .unwrap();

    assert_eq!(follow_ups.lock().unwrap().len(), 1);
    assert_eq!(harness.engine.request_count(), 2);
    assert_eq!(harness.engine.sync_requests().len(), 1);
    assert!(harness.bridge.table().is_empty());
    harness.assert_attach_balanced();
}

#[test]
fn test_destroyed_context_still_delivers_in_flight_callbacks() {
    let harness = BridgeHarness::new();
    let (continuation, log) = recording();
    let token = harness
        .bridge
        .request_async(test_context(), "net.wait_for_collection", "{}", continuation)
        .unwrap();

    harness.bridge.destroy_context(test_context());
    assert!(harness.bridge.table().contains_token(token));

    harness
        .engine
        .deliver(0, br#"{"code":1,"message":"context destroyed"}"#, ResponseKind::ERROR, true);
    assert_eq!(log.len(), 1);
    assert!(harness.bridge.table().is_empty());
}
