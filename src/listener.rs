//! The listener dispatch core.
//!
//! `HttpListener` pairs fully-parsed request contexts from the connection
//! layer with consumers pulling them through the get-context protocol. It
//! owns four containers, each behind its own mutex:
//!
//! - registry: every context known to the listener, in registration order
//! - connection set: live transports, independent of contexts (keep-alive)
//! - ready queue: FIFO of contexts no consumer has asked for yet
//! - wait queue: FIFO of pending calls no context has arrived for yet
//!
//! Lock discipline: the only multi-lock path (`begin_get_context` /
//! `register_context`) acquires the wait-queue lock before the ready-queue
//! lock, always. Registry and connection-set locks are acquired on their own.
//! Pending-call callbacks run with none of the four locks held, since
//! callback code may re-enter the listener.
//!
//! The ready queue and wait queue are never simultaneously non-empty: a
//! registration that finds a waiter resolves it instead of queuing, and a
//! retrieval that finds a queued context consumes it instead of blocking.
//! That is what makes delivery FIFO on both sides.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::config::{AuthSchemeSelector, AuthSchemes, ListenerConfig};
use crate::connection::Connection;
use crate::context::RequestContext;
use crate::endpoint::{EndpointManager, InProcessEndpoint};
use crate::error::{ListenerError, Result};
use crate::ids::{ConnectionId, ListenerId};
use crate::pending::{GetContextCallback, PendingCall};
use crate::prefix::PrefixCollection;

/// Lifecycle states of a listener.
///
/// `Disposed` is terminal and absorbing. `abort()` is a forced
/// `Listening → Stopped` transition that deliberately does NOT dispose;
/// a listener can be aborted and then started again. `close()`/`dispose()`
/// are the only paths into `Disposed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Created,
    Listening,
    Stopped,
    Disposed,
}

/// The request-dispatch core of an HTTP server listener.
///
/// Producers (the connection layer) call [`register_context`](Self::register_context)
/// as requests finish parsing; consumers call [`get_context`](Self::get_context)
/// or the [`begin_get_context`](Self::begin_get_context) /
/// [`end_get_context`](Self::end_get_context) pair. Contexts are delivered in
/// registration order and waiters are served in arrival order, paired 1:1.
///
/// All methods take `&self`; share the listener across threads or coroutines
/// with `Arc`.
pub struct HttpListener {
    id: ListenerId,
    state: Mutex<ListenerState>,
    config: Mutex<ListenerConfig>,
    prefixes: Arc<PrefixCollection>,
    endpoint: Arc<dyn EndpointManager>,
    // Containers below each have their own lock; see the module docs for
    // the acquisition order.
    registry: Mutex<Vec<RequestContext>>,
    connections: Mutex<Vec<Arc<dyn Connection>>>,
    ready_queue: Mutex<VecDeque<RequestContext>>,
    wait_queue: Mutex<VecDeque<Arc<PendingCall>>>,
}

impl Default for HttpListener {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpListener {
    /// Create a listener wired to an in-process endpoint registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_endpoint(Arc::new(InProcessEndpoint::new()))
    }

    /// Create a listener wired to the given endpoint collaborator.
    #[must_use]
    pub fn with_endpoint(endpoint: Arc<dyn EndpointManager>) -> Self {
        Self {
            id: ListenerId::new(),
            state: Mutex::new(ListenerState::Created),
            config: Mutex::new(ListenerConfig::default()),
            prefixes: Arc::new(PrefixCollection::new()),
            endpoint,
            registry: Mutex::new(Vec::new()),
            connections: Mutex::new(Vec::new()),
            ready_queue: Mutex::new(VecDeque::new()),
            wait_queue: Mutex::new(VecDeque::new()),
        }
    }

    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> ListenerState {
        *self.state.lock().unwrap()
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state() == ListenerState::Listening
    }

    fn ensure_not_disposed(&self) -> Result<()> {
        if self.state() == ListenerState::Disposed {
            return Err(ListenerError::Disposed);
        }
        Ok(())
    }

    // ---- configuration passthrough ----

    /// The prefix collection. Fails once disposed.
    pub fn prefixes(&self) -> Result<Arc<PrefixCollection>> {
        self.ensure_not_disposed()?;
        Ok(Arc::clone(&self.prefixes))
    }

    #[must_use]
    pub fn auth_schemes(&self) -> AuthSchemes {
        self.config.lock().unwrap().auth_schemes
    }

    pub fn set_auth_schemes(&self, schemes: AuthSchemes) -> Result<()> {
        self.ensure_not_disposed()?;
        self.config.lock().unwrap().auth_schemes = schemes;
        Ok(())
    }

    #[must_use]
    pub fn auth_selector(&self) -> Option<AuthSchemeSelector> {
        self.config.lock().unwrap().auth_selector.clone()
    }

    pub fn set_auth_selector(&self, selector: Option<AuthSchemeSelector>) -> Result<()> {
        self.ensure_not_disposed()?;
        self.config.lock().unwrap().auth_selector = selector;
        Ok(())
    }

    #[must_use]
    pub fn realm(&self) -> Option<String> {
        self.config.lock().unwrap().realm.clone()
    }

    pub fn set_realm(&self, realm: Option<String>) -> Result<()> {
        self.ensure_not_disposed()?;
        self.config.lock().unwrap().realm = realm;
        Ok(())
    }

    #[must_use]
    pub fn ignore_write_exceptions(&self) -> bool {
        self.config.lock().unwrap().ignore_write_exceptions
    }

    pub fn set_ignore_write_exceptions(&self, ignore: bool) -> Result<()> {
        self.ensure_not_disposed()?;
        self.config.lock().unwrap().ignore_write_exceptions = ignore;
        Ok(())
    }

    #[must_use]
    pub fn unsafe_legacy_auth(&self) -> bool {
        self.config.lock().unwrap().unsafe_legacy_auth
    }

    pub fn set_unsafe_legacy_auth(&self, allow: bool) -> Result<()> {
        self.ensure_not_disposed()?;
        self.config.lock().unwrap().unsafe_legacy_auth = allow;
        Ok(())
    }

    // ---- lifecycle ----

    /// Register with the endpoint layer and begin accepting contexts.
    ///
    /// No-op if already listening; fails once disposed. A stopped or aborted
    /// listener may be started again.
    pub fn start(&self) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                ListenerState::Disposed => return Err(ListenerError::Disposed),
                ListenerState::Listening => return Ok(()),
                ListenerState::Created | ListenerState::Stopped => {
                    *state = ListenerState::Listening;
                }
            }
        }
        self.endpoint.add_listener(self.id, self.prefixes.snapshot());
        info!(listener = %self.id, "Listener started");
        Ok(())
    }

    /// Graceful close: deregister from the endpoint layer and drain state.
    ///
    /// Existing registered contexts are left to their connections (their
    /// transports are still closed as part of draining the connection set
    /// and ready queue); blocked waiters resolve with
    /// [`ListenerError::Disposed`]. Fails once disposed.
    pub fn stop(&self) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            if *state == ListenerState::Disposed {
                return Err(ListenerError::Disposed);
            }
            *state = ListenerState::Stopped;
        }
        info!(listener = %self.id, "Listener stopping");
        self.endpoint.remove_listener(self.id);
        self.cleanup(false);
        Ok(())
    }

    /// Forced close that does NOT dispose the listener.
    ///
    /// Drops every live connection immediately. No-op if disposed or not
    /// listening. A subsequent `close()`/`dispose()` is still required to
    /// finalize teardown; until then the listener may be started again.
    pub fn abort(&self) {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                ListenerState::Listening => *state = ListenerState::Stopped,
                _ => return,
            }
        }
        warn!(listener = %self.id, "Listener aborted");
        self.endpoint.remove_listener(self.id);
        self.cleanup(true);
    }

    /// Forced close, then dispose. No-op if already disposed.
    pub fn close(&self) {
        let was_listening = {
            let mut state = self.state.lock().unwrap();
            match *state {
                ListenerState::Disposed => return,
                ListenerState::Listening => {
                    *state = ListenerState::Disposed;
                    true
                }
                ListenerState::Created | ListenerState::Stopped => {
                    *state = ListenerState::Disposed;
                    false
                }
            }
        };
        info!(listener = %self.id, forced = was_listening, "Listener closed");
        if was_listening {
            self.endpoint.remove_listener(self.id);
            self.cleanup(true);
        }
    }

    /// Dispose the listener: forced close regardless of current state, then
    /// mark disposed. No-op if already disposed. Equivalent to what `Drop`
    /// performs if the listener is dropped undisposed.
    pub fn dispose(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if *state == ListenerState::Disposed {
                return;
            }
            *state = ListenerState::Disposed;
        }
        info!(listener = %self.id, "Listener disposed");
        self.endpoint.remove_listener(self.id);
        self.cleanup(true);
    }

    // ---- get-context protocol ----

    /// Synchronously retrieve the next context, blocking until one arrives.
    ///
    /// Fails immediately with [`ListenerError::NoPrefixes`] when no prefixes
    /// are configured, since a waiter that can never be matched would block
    /// forever. The async path skips this check; callers driving
    /// `begin_get_context` directly are expected to manage their own prefixes.
    pub fn get_context(&self) -> Result<RequestContext> {
        if self.prefixes.is_empty() {
            return Err(ListenerError::NoPrefixes);
        }
        let call = self.begin_get_context(None)?;
        self.end_get_context(&call)
    }

    /// Begin an asynchronous get-context call.
    ///
    /// If a context is already queued the returned call is resolved before
    /// this method returns (and `callback`, if any, has already run on the
    /// calling thread). Otherwise the call joins the wait queue and resolves
    /// when a producer registers the next context; the callback then runs on
    /// the producer's thread. Either way the caller finishes the exchange
    /// with [`end_get_context`](Self::end_get_context).
    pub fn begin_get_context(
        &self,
        callback: Option<GetContextCallback>,
    ) -> Result<Arc<PendingCall>> {
        self.ensure_not_disposed()?;
        if !self.is_listening() {
            return Err(ListenerError::NotListening);
        }

        let call = PendingCall::new(self.id, callback);

        // Wait-queue lock taken first and held across the ready-queue probe
        // so no registration can slip between "queue empty" and "join wait
        // queue".
        let ready = {
            let mut wait_queue = self.wait_queue.lock().unwrap();
            let mut ready_queue = self.ready_queue.lock().unwrap();
            match ready_queue.pop_front() {
                Some(ctx) => Some(ctx),
                None => {
                    drop(ready_queue);
                    wait_queue.push_back(Arc::clone(&call));
                    None
                }
            }
        };

        match ready {
            Some(ctx) => {
                debug!(listener = %self.id, context = %ctx.id(), "Context ready, completing synchronously");
                call.complete(Ok(ctx), true);
            }
            None => {
                debug!(listener = %self.id, "No context ready, call queued");
            }
        }
        Ok(call)
    }

    /// Finish an asynchronous get-context call, blocking until it resolves.
    ///
    /// Fails with [`ListenerError::ForeignCall`] for a call issued by a
    /// different listener and [`ListenerError::AlreadyEnded`] when called
    /// twice on the same call. If the listener was disposed while the call
    /// waited, the disposal failure is returned here.
    pub fn end_get_context(&self, call: &Arc<PendingCall>) -> Result<RequestContext> {
        self.ensure_not_disposed()?;
        if call.owner() != self.id {
            return Err(ListenerError::ForeignCall);
        }
        call.mark_ended()?;

        call.wait();

        // The producer that resolved the call already removed it; this
        // covers the synchronous-completion path and is benign otherwise.
        {
            let mut wait_queue = self.wait_queue.lock().unwrap();
            if let Some(pos) = wait_queue.iter().position(|c| Arc::ptr_eq(c, call)) {
                wait_queue.remove(pos);
            }
        }

        call.take_outcome()
    }

    // ---- producer side ----

    /// Make a freshly-parsed context available for dispatch.
    ///
    /// Resolves the oldest waiting call if any, otherwise queues the context.
    /// Called by the connection layer; the waiter's callback runs on this
    /// thread, after every listener lock has been released.
    pub fn register_context(&self, ctx: RequestContext) {
        // A producer can race a registration in after disposal; cleanup has
        // already run, so the context would otherwise leak with its transport
        // left open.
        if self.state() == ListenerState::Disposed {
            warn!(listener = %self.id, context = %ctx.id(), "Context registered after disposal, dropping");
            ctx.connection().close(true);
            return;
        }
        self.registry.lock().unwrap().push(ctx.clone());

        let waiter = {
            let mut wait_queue = self.wait_queue.lock().unwrap();
            match wait_queue.pop_front() {
                Some(call) => Some(call),
                None => {
                    self.ready_queue.lock().unwrap().push_back(ctx.clone());
                    None
                }
            }
        };

        match waiter {
            Some(call) => {
                debug!(listener = %self.id, context = %ctx.id(), "Context paired with waiting call");
                call.complete(Ok(ctx), false);
            }
            None => {
                debug!(listener = %self.id, context = %ctx.id(), "Context queued");
            }
        }
    }

    /// Discard a context that will never be retrieved (connection reset,
    /// client went away). No-op if the context is already gone.
    pub fn unregister_context(&self, ctx: &RequestContext) {
        self.registry.lock().unwrap().retain(|c| c != ctx);
        self.ready_queue.lock().unwrap().retain(|c| c != ctx);
        debug!(listener = %self.id, context = %ctx.id(), "Context unregistered");
    }

    // ---- connection tracking ----

    /// Track a newly-accepted transport connection.
    pub fn add_connection(&self, cnc: Arc<dyn Connection>) {
        let mut connections = self.connections.lock().unwrap();
        if !connections.iter().any(|c| c.id() == cnc.id()) {
            connections.push(cnc);
        }
    }

    /// Forget a connection that closed on its own. Benign no-op when absent.
    pub fn remove_connection(&self, id: ConnectionId) {
        self.connections.lock().unwrap().retain(|c| c.id() != id);
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    // ---- shutdown sequencing ----

    /// Drain all four containers, in the fixed order registry → connection
    /// set → ready queue → wait queue.
    ///
    /// Each container is snapshotted and cleared under its own lock, then the
    /// snapshot is processed with no lock held: closing a connection may
    /// re-enter the listener (`unregister_context`, `remove_connection`), so
    /// live containers are never iterated while their members are closed.
    /// Contexts and connections close in reverse registration order.
    fn cleanup(&self, force_existing: bool) {
        if force_existing {
            let doomed: Vec<RequestContext> = {
                let mut registry = self.registry.lock().unwrap();
                registry.drain(..).collect()
            };
            if !doomed.is_empty() {
                warn!(listener = %self.id, count = doomed.len(), "Force-closing registered contexts");
            }
            for ctx in doomed.iter().rev() {
                ctx.connection().close(true);
            }
        }

        let connections: Vec<Arc<dyn Connection>> = {
            let mut connections = self.connections.lock().unwrap();
            connections.drain(..).collect()
        };
        for cnc in connections.iter().rev() {
            cnc.close(true);
        }

        let queued: Vec<RequestContext> = {
            let mut ready_queue = self.ready_queue.lock().unwrap();
            ready_queue.drain(..).collect()
        };
        for ctx in queued.iter().rev() {
            ctx.connection().close(true);
        }

        let waiters: Vec<Arc<PendingCall>> = {
            let mut wait_queue = self.wait_queue.lock().unwrap();
            wait_queue.drain(..).collect()
        };
        if !waiters.is_empty() {
            info!(listener = %self.id, count = waiters.len(), "Failing pending calls");
        }
        for call in &waiters {
            call.complete(Err(ListenerError::Disposed), false);
        }
    }

    #[cfg(test)]
    pub(crate) fn queue_depths(&self) -> (usize, usize) {
        let ready = self.ready_queue.lock().unwrap().len();
        let waiting = self.wait_queue.lock().unwrap().len();
        (ready, waiting)
    }
}

impl Drop for HttpListener {
    fn drop(&mut self) {
        if self.state() != ListenerState::Disposed {
            self.dispose();
        }
    }
}

impl std::fmt::Debug for HttpListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpListener")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("prefixes", &self.prefixes.snapshot())
            .finish()
    }
}
