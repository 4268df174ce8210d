//! Seam between the dispatch core and the transport layer.

use crate::ids::ConnectionId;

/// A live transport connection owned by a listener.
///
/// The core never performs socket I/O; the only thing it does with a
/// connection is force-close it while tearing down. One connection may yield
/// zero, one, or many request contexts over its life (keep-alive), which is
/// why connections are tracked independently of contexts.
///
/// `close(true)` may re-enter the listener (for example to unregister a
/// context that was parsed but never retrieved); the core's cleanup
/// sequencing never holds a lock across a close call for that reason.
pub trait Connection: Send + Sync {
    /// Identity of this connection within the listener's connection set.
    fn id(&self) -> ConnectionId;

    /// Close the underlying transport. `force` drops it immediately;
    /// otherwise the connection may finish writing a response in flight.
    fn close(&self, force: bool);
}
