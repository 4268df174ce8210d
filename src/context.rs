//! Request contexts: the unit of work the dispatch core hands to consumers.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;

use crate::connection::Connection;
use crate::ids::ContextId;

/// Maximum inline headers before heap allocation. Most requests carry ≤16.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage.
///
/// Header names use `Arc<str>` because they repeat heavily across requests
/// (Content-Type, Host, ...) and `Arc::clone()` is an O(1) atomic increment;
/// values are per-request data and stay `String`.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

struct ContextInner {
    id: ContextId,
    connection: Arc<dyn Connection>,
    method: Method,
    path: String,
    headers: HeaderVec,
}

/// One fully-parsed inbound HTTP request awaiting consumption.
///
/// Produced by the connection layer once parsing completes, registered into
/// the listener, and either retrieved by a consumer or force-closed during
/// shutdown. A context is a cheap `Arc` handle: clones share identity, and
/// equality/hashing go through [`ContextId`], never through request data.
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

impl RequestContext {
    /// Build a context for a parsed request on `connection`.
    pub fn new(
        connection: Arc<dyn Connection>,
        method: Method,
        path: impl Into<String>,
        headers: HeaderVec,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id: ContextId::new(),
                connection,
                method,
                path: path.into(),
                headers,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// The connection this request arrived on. Needed so the core can
    /// force-close the transport when a registered context is discarded.
    #[must_use]
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.inner.connection
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.inner
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.inner.headers
    }
}

impl PartialEq for RequestContext {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for RequestContext {}

impl Hash for RequestContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("id", &self.inner.id)
            .field("connection", &self.inner.connection.id())
            .field("method", &self.inner.method)
            .field("path", &self.inner.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ConnectionId;

    struct NoopConnection(ConnectionId);

    impl Connection for NoopConnection {
        fn id(&self) -> ConnectionId {
            self.0
        }
        fn close(&self, _force: bool) {}
    }

    fn ctx(path: &str) -> RequestContext {
        RequestContext::new(
            Arc::new(NoopConnection(ConnectionId::new())),
            Method::GET,
            path,
            HeaderVec::new(),
        )
    }

    #[test]
    fn test_identity_equality() {
        let a = ctx("/same");
        let b = ctx("/same");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("Content-Type"), "application/json".to_string()));
        let ctx = RequestContext::new(
            Arc::new(NoopConnection(ConnectionId::new())),
            Method::POST,
            "/items",
            headers,
        );
        assert_eq!(ctx.get_header("content-type"), Some("application/json"));
        assert_eq!(ctx.get_header("accept"), None);
    }
}
