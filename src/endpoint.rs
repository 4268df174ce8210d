//! Endpoint-layer seam: routing registration for inbound connections.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::info;

use crate::ids::ListenerId;

/// The socket/endpoint collaborator.
///
/// `start()` registers the listener so the endpoint layer begins routing
/// inbound connections to it by prefix; `stop()`/`close()` deregister it.
/// The dispatch core never touches sockets itself.
pub trait EndpointManager: Send + Sync {
    /// Begin routing connections matching `prefixes` to the listener.
    fn add_listener(&self, listener: ListenerId, prefixes: Vec<String>);

    /// Stop routing to the listener. Unknown ids are benign no-ops.
    fn remove_listener(&self, listener: ListenerId);
}

/// In-process endpoint registry: tracks which listeners are routable and the
/// prefix snapshot they registered with. Suitable default when the real
/// socket layer lives elsewhere, and what the integration tests observe.
#[derive(Debug, Default)]
pub struct InProcessEndpoint {
    listeners: Mutex<HashMap<ListenerId, Vec<String>>>,
}

impl InProcessEndpoint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the listener is currently registered for routing.
    #[must_use]
    pub fn is_registered(&self, listener: ListenerId) -> bool {
        self.listeners.lock().unwrap().contains_key(&listener)
    }

    /// The prefixes the listener registered with, if routable.
    #[must_use]
    pub fn prefixes_for(&self, listener: ListenerId) -> Option<Vec<String>> {
        self.listeners.lock().unwrap().get(&listener).cloned()
    }
}

impl EndpointManager for InProcessEndpoint {
    fn add_listener(&self, listener: ListenerId, prefixes: Vec<String>) {
        info!(listener = %listener, prefixes = ?prefixes, "Listener registered with endpoint");
        self.listeners.lock().unwrap().insert(listener, prefixes);
    }

    fn remove_listener(&self, listener: ListenerId) {
        info!(listener = %listener, "Listener deregistered from endpoint");
        self.listeners.lock().unwrap().remove(&listener);
    }
}
