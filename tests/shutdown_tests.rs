//! Tests for shutdown and cleanup sequencing.
//!
//! # Test Coverage
//!
//! - Pending calls resolve with a disposed failure on close/dispose
//! - Blocked consumers are released, not leaked
//! - Registered contexts and live connections are force-closed
//! - Reverse registration order for forced closes
//! - Reentrant closes (a closing connection calling back into the listener)
//! - Graceful stop() drains queues without failing producers

mod common;

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use brrtlistener::{
    Connection, ConnectionId, HeaderVec, HttpListener, ListenerError, RequestContext,
};
use common::{make_context, make_context_on, setup_may_runtime, FakeConnection};
use http::Method;

fn started_listener() -> Arc<HttpListener> {
    setup_may_runtime();
    let listener = Arc::new(HttpListener::new());
    listener.prefixes().unwrap().add("http://+:8080/").unwrap();
    listener.start().unwrap();
    listener
}

#[test]
fn test_close_fails_pending_call_with_disposed() {
    let listener = started_listener();
    let w1 = listener.begin_get_context(None).unwrap();
    assert!(!w1.is_completed());

    listener.close();

    assert!(w1.is_completed());
    assert_eq!(listener.end_get_context(&w1), Err(ListenerError::Disposed));
}

#[test]
fn test_close_releases_blocked_consumer() {
    let listener = started_listener();

    let consumer = {
        let listener = Arc::clone(&listener);
        thread::spawn(move || listener.get_context())
    };
    thread::sleep(Duration::from_millis(50));

    listener.close();

    assert_eq!(consumer.join().unwrap(), Err(ListenerError::Disposed));
}

#[test]
fn test_register_after_close_is_not_delivered() {
    let listener = started_listener();
    listener.close();

    // The connection layer may still race a registration in; the context is
    // dropped and its transport closed rather than leaked.
    let conn = FakeConnection::new();
    listener.register_context(make_context_on(Arc::clone(&conn), "/too-late"));
    assert!(conn.was_force_closed());
    assert_eq!(listener.get_context(), Err(ListenerError::Disposed));
    assert_eq!(
        listener.begin_get_context(None).unwrap_err(),
        ListenerError::Disposed
    );
}

#[test]
fn test_forced_close_reaches_contexts_and_connections() {
    let listener = started_listener();

    let tracked = FakeConnection::new();
    listener.add_connection(Arc::clone(&tracked) as Arc<dyn Connection>);

    let ctx_conn = FakeConnection::new();
    listener.register_context(make_context_on(Arc::clone(&ctx_conn), "/pending"));

    listener.close();

    assert!(tracked.was_force_closed());
    assert!(ctx_conn.was_force_closed());
    assert_eq!(listener.connection_count(), 0);
}

#[test]
fn test_forced_close_runs_in_reverse_registration_order() {
    let listener = started_listener();
    let order = Arc::new(Mutex::new(Vec::new()));

    let conns: Vec<_> = (0..3)
        .map(|_| FakeConnection::with_order_log(Arc::clone(&order)))
        .collect();
    for (i, conn) in conns.iter().enumerate() {
        listener.register_context(make_context_on(Arc::clone(conn), &format!("/req/{i}")));
    }

    listener.close();

    let expected: Vec<ConnectionId> = conns.iter().rev().map(|c| c.id()).collect();
    // Each context is closed twice: once from the registry snapshot, once
    // from the ready queue, preserving the registry-first ordering.
    let closed = order.lock().unwrap();
    assert_eq!(closed[..3], expected[..]);
}

#[test]
fn test_stop_drains_but_reports_gracefully() {
    let listener = started_listener();

    let queued_conn = FakeConnection::new();
    listener.register_context(make_context_on(Arc::clone(&queued_conn), "/queued"));
    let w_after = {
        // Consume the queued context so a fresh waiter can block.
        let first = listener.begin_get_context(None).unwrap();
        listener.end_get_context(&first).unwrap();
        listener.begin_get_context(None).unwrap()
    };

    listener.stop().unwrap();

    // The waiter resolves with the disposal failure even though the listener
    // itself is only stopped, not disposed.
    assert_eq!(
        listener.end_get_context(&w_after),
        Err(ListenerError::Disposed)
    );
    assert!(!listener.is_listening());

    // Stopped is not terminal: the listener can start serving again.
    listener.start().unwrap();
    let replay = make_context("/again");
    listener.register_context(replay.clone());
    assert_eq!(listener.get_context().unwrap(), replay);
}

/// A connection that re-enters the listener while being closed, the way a
/// real transport unregisters its half-parsed context on teardown.
struct ReentrantConnection {
    id: ConnectionId,
    listener: Mutex<Option<Arc<HttpListener>>>,
    context: Mutex<Option<RequestContext>>,
}

impl ReentrantConnection {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(),
            listener: Mutex::new(None),
            context: Mutex::new(None),
        })
    }
}

impl Connection for ReentrantConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn close(&self, _force: bool) {
        let listener = self.listener.lock().unwrap().take();
        let context = self.context.lock().unwrap().take();
        if let (Some(listener), Some(context)) = (listener, context) {
            listener.unregister_context(&context);
            listener.remove_connection(self.id);
        }
    }
}

#[test]
fn test_cleanup_survives_reentrant_close() {
    let listener = started_listener();

    let conn = ReentrantConnection::new();
    let ctx = RequestContext::new(
        Arc::clone(&conn) as Arc<dyn Connection>,
        Method::GET,
        "/reentrant",
        HeaderVec::new(),
    );
    *conn.listener.lock().unwrap() = Some(Arc::clone(&listener));
    *conn.context.lock().unwrap() = Some(ctx.clone());

    listener.add_connection(Arc::clone(&conn) as Arc<dyn Connection>);
    listener.register_context(ctx);

    // Must not deadlock: close() iterates snapshots, so the re-entrant
    // unregister/remove calls find unlocked containers.
    listener.close();
    assert_eq!(listener.connection_count(), 0);
}

#[test]
fn test_dispose_is_idempotent_under_contention() {
    let listener = started_listener();
    for _ in 0..4 {
        listener.register_context(make_context("/spin"));
    }

    let closers: Vec<_> = (0..4)
        .map(|_| {
            let listener = Arc::clone(&listener);
            thread::spawn(move || listener.dispose())
        })
        .collect();
    for handle in closers {
        handle.join().unwrap();
    }
    assert_eq!(listener.get_context(), Err(ListenerError::Disposed));
}
