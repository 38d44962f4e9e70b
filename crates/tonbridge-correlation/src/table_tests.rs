use super::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tonbridge_core::{
    Continuation, ContextHandle, ContinuationError, ResponseEvent, ResponseKind, continuation_fn,
};

/// Continuation that counts how often it is released.
struct DropCounter {
    drops: Arc<AtomicUsize>,
}

impl Continuation for DropCounter {
    fn invoke_one_shot(&self, _event: ResponseEvent) -> Result<(), ContinuationError> {
        Ok(())
    }
}

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn counted() -> (ContinuationHandle, Arc<AtomicUsize>) {
    let drops = Arc::new(AtomicUsize::new(0));
    let handle: ContinuationHandle = Arc::new(DropCounter {
        drops: Arc::clone(&drops),
    });
    (handle, drops)
}

fn noop() -> ContinuationHandle {
    continuation_fn(|_| Ok(()))
}

#[test]
fn test_register_mints_distinct_tokens() {
    let table = CorrelationTable::new();
    let a = table.register(noop()).unwrap();
    let b = table.register(noop()).unwrap();
    assert_ne!(a, b);
    assert_eq!(table.one_shot_len(), 2);
    assert!(table.contains_token(a));
    assert!(table.contains_token(b));
}

#[test]
fn test_terminal_resolve_retires_exactly_once() {
    let table = CorrelationTable::new();
    let token = table.register(noop()).unwrap();

    let resolved = table.resolve(token, true).unwrap();
    assert!(resolved.is_retired());
    assert!(!table.contains_token(token));

    let err = table.resolve(token, true).unwrap_err();
    assert_eq!(err, CorrelationError::NotFound(CorrelationKey::Token(token)));
}

#[test]
fn test_streaming_resolve_keeps_entry() {
    let table = CorrelationTable::new();
    let token = table.register(noop()).unwrap();

    for _ in 0..5 {
        let resolved = table.resolve(token, false).unwrap();
        assert!(!resolved.is_retired());
        assert!(table.contains_token(token));
    }

    assert!(table.resolve(token, true).unwrap().is_retired());
    assert!(table.is_empty());
}

#[test]
fn test_unknown_token_is_not_found_and_not_created() {
    let table = CorrelationTable::new();
    let unknown = CorrelationToken::from_raw(99);

    assert!(matches!(
        table.resolve(unknown, false),
        Err(CorrelationError::NotFound(_))
    ));
    assert!(matches!(
        table.resolve_and_remove(unknown),
        Err(CorrelationError::NotFound(_))
    ));
    assert!(table.peek(unknown).is_err());
    assert!(table.is_empty());
}

#[test]
fn test_first_token_is_honored() {
    let table = CorrelationTable::new().with_first_token(7);
    assert_eq!(table.register(noop()).unwrap().get(), 7);
    assert_eq!(table.register(noop()).unwrap().get(), 8);
}

#[test]
fn test_wraparound_skips_zero_and_live_tokens() {
    let table = CorrelationTable::new().with_first_token(u32::MAX);
    let last = table.register(noop()).unwrap();
    assert_eq!(last.get(), u32::MAX);

    // Counter wraps to 0, which is reserved.
    let first = table.register(noop()).unwrap();
    assert_eq!(first.get(), 1);

    // Walk the counter back onto the live tokens.
    let table = table.with_first_token(u32::MAX);
    let next = table.register(noop()).unwrap();
    assert_eq!(next.get(), 2);
}

#[test]
fn test_capacity_limit() {
    let table = CorrelationTable::new().with_max_live_entries(2);
    let a = table.register(noop()).unwrap();
    table.register(noop()).unwrap();

    assert_eq!(
        table.register(noop()).unwrap_err(),
        CorrelationError::CapacityExceeded { limit: 2 }
    );

    table.resolve(a, true).unwrap();
    assert!(table.register(noop()).is_ok());
}

#[test]
fn test_capacity_limit_ignores_persistent_entries() {
    let table = CorrelationTable::new().with_max_live_entries(1);
    table.register_for_application(AppId::new(1), noop());
    table.register_for_application(AppId::new(2), noop());
    assert!(table.register(noop()).is_ok());
}

#[test]
fn test_retired_entry_releases_continuation_once() {
    let table = CorrelationTable::new();
    let (handle, drops) = counted();
    let token = table.register(handle).unwrap();

    let streaming = table.resolve(token, false).unwrap();
    drop(streaming);
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    let retired = table.resolve(token, true).unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    drop(retired);
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    assert!(table.resolve(token, true).is_err());
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_application_last_write_wins() {
    let table = CorrelationTable::new();
    let app = AppId::new(4);
    let (first, first_drops) = counted();

    assert!(table.register_for_application(app, first).is_none());

    let marker = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&marker);
    let second = continuation_fn(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let replaced = table.register_for_application(app, second);
    assert!(replaced.is_some());
    drop(replaced);
    assert_eq!(first_drops.load(Ordering::SeqCst), 1);

    table
        .resolve_for_application(app)
        .unwrap()
        .invoke_for_application(app, ResponseEvent::new(ResponseKind::SUCCESS, "", false))
        .unwrap();
    assert_eq!(marker.load(Ordering::SeqCst), 1);
    assert_eq!(table.application_len(), 1);
}

#[test]
fn test_application_lookup_does_not_remove() {
    let table = CorrelationTable::new();
    let app = AppId::new(9);
    table.register_for_application(app, noop());

    for _ in 0..3 {
        table.resolve_for_application(app).unwrap();
    }
    assert!(table.contains_application(app));
}

#[test]
fn test_unregister_then_not_found() {
    let table = CorrelationTable::new();
    let app = AppId::new(9);
    let (handle, drops) = counted();
    table.register_for_application(app, handle);

    let entry = table.unregister(app).unwrap();
    assert_eq!(entry.key(), CorrelationKey::Application(app));
    drop(entry);
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    assert_eq!(
        table.resolve_for_application(app).err().unwrap(),
        CorrelationError::NotFound(CorrelationKey::Application(app))
    );
    assert!(table.unregister(app).is_err());
}

#[test]
fn test_tokens_and_app_ids_do_not_collide() {
    let table = CorrelationTable::new();
    let token = table.register(noop()).unwrap();
    let app = AppId::new(token.get());
    table.register_for_application(app, noop());

    table.resolve(token, true).unwrap();
    assert!(table.contains_application(app));
}

#[test]
fn test_cancel_removes_entry() {
    let table = CorrelationTable::new();
    let token = table
        .register_with_origin(noop(), RequestOrigin::new(ContextHandle::new(1), "client.version"))
        .unwrap();

    let entry = table.cancel(token).unwrap();
    assert_eq!(entry.origin().unwrap().function, "client.version");
    assert!(table.cancel(token).is_err());
}

#[test]
fn test_drain_empties_table() {
    let table = CorrelationTable::new();
    let (handle, drops) = counted();
    table.register(handle).unwrap();
    table
        .register_with_origin(noop(), RequestOrigin::new(ContextHandle::new(2), "net.subscribe"))
        .unwrap();
    table.register_for_application(AppId::new(1), noop());

    let drained = table.drain();
    assert_eq!(drained.len(), 3);
    assert!(table.is_empty());
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    drop(drained);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_continuation_may_reenter_table() {
    let table = Arc::new(CorrelationTable::new());
    let inner = Arc::clone(&table);
    let reentrant = continuation_fn(move |_| {
        inner.register(continuation_fn(|_| Ok(()))).map(|_| ()).map_err(|e| {
            ContinuationError::new(e.to_string())
        })
    });

    let token = table.register(reentrant).unwrap();
    let resolved = table.resolve(token, true).unwrap();
    resolved
        .continuation()
        .invoke_one_shot(ResponseEvent::new(ResponseKind::SUCCESS, "", true))
        .unwrap();
    assert_eq!(table.one_shot_len(), 1);
}

#[test]
fn test_concurrent_registration_never_aliases() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 500;

    let table = CorrelationTable::new();
    let tokens: Vec<CorrelationToken> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    (0..PER_THREAD)
                        .map(|_| table.register(noop()).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: HashSet<_> = tokens.iter().copied().collect();
    assert_eq!(unique.len(), THREADS * PER_THREAD);
    assert_eq!(table.one_shot_len(), THREADS * PER_THREAD);
    for token in tokens {
        assert!(table.contains_token(token));
    }
}

#[test]
fn test_concurrent_terminal_resolution_retires_once() {
    let table = CorrelationTable::new();
    let token = table.register(noop()).unwrap();

    let retired: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| table.resolve(token, true).is_ok()))
            .collect();
        handles
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum()
    });

    assert_eq!(retired, 1);
}
