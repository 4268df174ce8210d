//! Shared test fixtures: fake connections and context builders.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use brrtlistener::{Connection, ConnectionId, HeaderVec, RequestContext};
use http::Method;

/// Ensures May coroutines and tracing are configured only once per binary.
static MAY_INIT: Once = Once::new();

pub fn setup_may_runtime() {
    MAY_INIT.call_once(|| {
        may::config().set_stack_size(0x8000);
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Transport stand-in that records how it was closed.
pub struct FakeConnection {
    id: ConnectionId,
    forced_closes: AtomicUsize,
    graceful_closes: AtomicUsize,
    /// Shared log recording close order across connections.
    close_order: Option<Arc<Mutex<Vec<ConnectionId>>>>,
}

impl FakeConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(),
            forced_closes: AtomicUsize::new(0),
            graceful_closes: AtomicUsize::new(0),
            close_order: None,
        })
    }

    /// A connection that appends its id to `order` on every close.
    pub fn with_order_log(order: Arc<Mutex<Vec<ConnectionId>>>) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(),
            forced_closes: AtomicUsize::new(0),
            graceful_closes: AtomicUsize::new(0),
            close_order: Some(order),
        })
    }

    pub fn forced_close_count(&self) -> usize {
        self.forced_closes.load(Ordering::SeqCst)
    }

    pub fn was_force_closed(&self) -> bool {
        self.forced_close_count() > 0
    }
}

impl Connection for FakeConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn close(&self, force: bool) {
        if force {
            self.forced_closes.fetch_add(1, Ordering::SeqCst);
        } else {
            self.graceful_closes.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(order) = &self.close_order {
            order.lock().unwrap().push(self.id);
        }
    }
}

/// A GET context on its own fake connection.
pub fn make_context(path: &str) -> RequestContext {
    RequestContext::new(FakeConnection::new(), Method::GET, path, HeaderVec::new())
}

/// A context pinned to a specific connection.
pub fn make_context_on(connection: Arc<FakeConnection>, path: &str) -> RequestContext {
    RequestContext::new(connection, Method::GET, path, HeaderVec::new())
}
