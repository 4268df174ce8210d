//! Single-resolution completion primitive backing the begin/end protocol.

use std::sync::{Arc, Mutex, Weak};

use may::sync::mpsc;
use tracing::debug;

use crate::context::RequestContext;
use crate::error::{ListenerError, Result};
use crate::ids::ListenerId;

/// Callback invoked when a pending call resolves.
///
/// Runs on whichever thread performs the resolution: the consumer's own
/// thread when `begin_get_context` finds a context already queued, or the
/// producer's thread when a later `register_context` pairs up with the call.
/// Callers must not assume a particular thread identity, and the callback is
/// always invoked with no listener lock held, so it may safely re-enter the
/// listener (typically to call `end_get_context`).
pub type GetContextCallback = Box<dyn FnOnce(Arc<PendingCall>) + Send + 'static>;

struct CallState {
    outcome: Option<Result<RequestContext>>,
    callback: Option<GetContextCallback>,
    completed_synchronously: bool,
    end_called: bool,
}

/// One consumer's outstanding request for the next context.
///
/// Resolved exactly once, by whichever actor gets there first: the producer
/// that registers a matching context, the consumer itself when a context was
/// already queued, or shutdown failing the call with
/// [`ListenerError::Disposed`]. A second resolution attempt is a silent no-op.
///
/// Blocking in [`HttpListener::end_get_context`](crate::listener::HttpListener::end_get_context)
/// is a one-shot channel receive, so it parks only the calling coroutine,
/// not the OS thread, under the `may` runtime.
pub struct PendingCall {
    owner: ListenerId,
    // Handed to the completion callback; always upgradable while the call
    // is reachable through an Arc.
    self_ref: Weak<PendingCall>,
    state: Mutex<CallState>,
    done_tx: mpsc::Sender<()>,
    done_rx: Mutex<mpsc::Receiver<()>>,
}

impl PendingCall {
    pub(crate) fn new(owner: ListenerId, callback: Option<GetContextCallback>) -> Arc<Self> {
        let (done_tx, done_rx) = mpsc::channel();
        Arc::new_cyclic(|self_ref| Self {
            owner,
            self_ref: Weak::clone(self_ref),
            state: Mutex::new(CallState {
                outcome: None,
                callback,
                completed_synchronously: false,
                end_called: false,
            }),
            done_tx,
            done_rx: Mutex::new(done_rx),
        })
    }

    /// The listener that issued this call.
    pub(crate) fn owner(&self) -> ListenerId {
        self.owner
    }

    /// Whether the call has resolved (with a context or a failure).
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state.lock().unwrap().outcome.is_some()
    }

    /// Whether the call resolved inline during `begin_get_context`, i.e. a
    /// context was already queued when the consumer asked.
    #[must_use]
    pub fn completed_synchronously(&self) -> bool {
        self.state.lock().unwrap().completed_synchronously
    }

    /// Resolve the call. First resolution wins; later attempts are no-ops.
    ///
    /// Must be called with no listener container lock held: the callback is
    /// untrusted and may re-enter the listener.
    pub(crate) fn complete(&self, outcome: Result<RequestContext>, synchronous: bool) {
        let callback = {
            let mut state = self.state.lock().unwrap();
            if state.outcome.is_some() {
                debug!(owner = %self.owner, "pending call already resolved, ignoring");
                return;
            }
            state.outcome = Some(outcome);
            state.completed_synchronously = synchronous;
            state.callback.take()
        };

        // Wake the (at most one) blocked end_get_context call. The send
        // cannot fail while `self` keeps the receiver alive.
        let _ = self.done_tx.send(());

        if let Some(cb) = callback {
            if let Some(this) = self.self_ref.upgrade() {
                cb(this);
            }
        }
    }

    /// Flip the end-called latch, failing the second caller.
    pub(crate) fn mark_ended(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.end_called {
            return Err(ListenerError::AlreadyEnded);
        }
        state.end_called = true;
        Ok(())
    }

    /// Block the calling coroutine until the call resolves.
    pub(crate) fn wait(&self) {
        if self.is_completed() {
            return;
        }
        let rx = self.done_rx.lock().unwrap();
        while !self.is_completed() {
            if rx.recv().is_err() {
                break;
            }
        }
    }

    /// Move the outcome out. Only valid after [`wait`](Self::wait); the
    /// fallback covers a call torn down mid-resolution.
    pub(crate) fn take_outcome(&self) -> Result<RequestContext> {
        self.state
            .lock()
            .unwrap()
            .outcome
            .take()
            .unwrap_or(Err(ListenerError::Disposed))
    }
}

impl std::fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("PendingCall")
            .field("owner", &self.owner)
            .field("completed", &state.outcome.is_some())
            .field("completed_synchronously", &state.completed_synchronously)
            .field("end_called", &state.end_called)
            .finish()
    }
}
