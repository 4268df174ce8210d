//! # BRRTListener
//!
//! **BRRTListener** is the request-dispatch core of an HTTP server listener for
//! the `may` coroutine runtime: a thread-safe producer/consumer matching engine
//! that pairs fully-parsed request contexts from a connection layer with
//! consumers pulling them synchronously or through a begin/end protocol.
//!
//! ## Overview
//!
//! A connection layer parses inbound HTTP traffic and calls
//! [`HttpListener::register_context`] once a request is complete. Consumers
//! ask for the next request with [`HttpListener::get_context`] (blocking) or
//! [`HttpListener::begin_get_context`] / [`HttpListener::end_get_context`]
//! (asynchronous, callback-capable). The listener guarantees:
//!
//! - contexts are delivered in registration order (FIFO)
//! - waiting consumers are served in arrival order (FIFO), paired 1:1
//! - the ready queue and wait queue are never simultaneously non-empty
//! - shutdown drains both in-flight requests and blocked consumers, without
//!   leaks or deadlock: connections are force-closed, waiters resolve with
//!   [`ListenerError::Disposed`]
//!
//! ## Architecture
//!
//! - **[`listener`]** - `HttpListener`: lifecycle state machine, the
//!   get-context protocol, register/unregister, shutdown sequencing
//! - **[`pending`]** - `PendingCall`: single-resolution completion primitive
//!   behind the begin/end protocol
//! - **[`context`]** - `RequestContext`: identity-equal handle for one parsed
//!   request, carrying its owning connection
//! - **[`connection`]** - `Connection` trait: the transport seam; the core
//!   only ever force-closes through it
//! - **[`endpoint`]** - `EndpointManager` trait plus an in-process registry:
//!   where `start()`/`close()` (de)register the listener for routing
//! - **[`prefix`]** - address-prefix collection consumed by the endpoint layer
//! - **[`config`]** - passthrough authentication/realm configuration
//! - **[`static_objects`]** - lazily-instantiated named object collection
//!   with byte-level serialization
//! - **[`error`]** - `ListenerError` taxonomy
//! - **[`ids`]** - ULID-backed typed identifiers
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use brrtlistener::HttpListener;
//!
//! let listener = Arc::new(HttpListener::new());
//! listener.prefixes().unwrap().add("http://+:8080/").unwrap();
//! listener.start().unwrap();
//!
//! // Connection layer, on its own threads/coroutines:
//! //   listener.register_context(ctx);
//!
//! // Consumer loop:
//! while let Ok(ctx) = listener.get_context() {
//!     println!("{} {}", ctx.method(), ctx.path());
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! Multiple producer threads and arbitrary consumer threads may call in
//! concurrently; there is no event loop. Each internal container has its own
//! mutex; the single multi-lock path acquires the wait-queue lock before the
//! ready-queue lock. The only blocking operation is `end_get_context`, which
//! parks on a one-shot `may::sync::mpsc` receive, so under the `may` runtime
//! it suspends the calling coroutine rather than the OS thread. Pending-call
//! callbacks run on whichever thread resolves the call, with no listener lock
//! held, so they may safely re-enter the listener.
//!
//! ## Lifecycle
//!
//! `Created → Listening → Stopped`, with `Disposed` terminal and absorbing.
//! [`HttpListener::abort`] is a forced stop that does *not* dispose: the
//! listener can be started again afterwards, and a later `close()`/`dispose()`
//! is still required to finalize teardown.

pub mod config;
pub mod connection;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod ids;
pub mod listener;
pub mod pending;
pub mod prefix;
pub mod static_objects;

pub use config::{AuthSchemeSelector, AuthSchemes, ListenerConfig};
pub use connection::Connection;
pub use context::{HeaderVec, RequestContext, MAX_INLINE_HEADERS};
pub use endpoint::{EndpointManager, InProcessEndpoint};
pub use error::{ListenerError, Result};
pub use ids::{ConnectionId, ContextId, ListenerId};
pub use listener::{HttpListener, ListenerState};
pub use pending::{GetContextCallback, PendingCall};
pub use prefix::PrefixCollection;
pub use static_objects::{ObjectFactory, StaticObjects};
