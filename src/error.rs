//! Error types for the listener dispatch core.
//!
//! Every failure is reported synchronously to the caller that triggered it,
//! with one exception: pending calls still unresolved when disposal begins
//! are resolved with [`ListenerError::Disposed`] through the same completion
//! path as a successful context. Nothing is retried internally.

use thiserror::Error;

/// Failures surfaced by the listener dispatch core.
///
/// `Clone` so a single disposal can be fanned out to every drained waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ListenerError {
    /// Any operation invoked after `close()`/`dispose()`, including pending
    /// calls still unresolved when disposal began.
    #[error("listener has been disposed")]
    Disposed,

    /// Get-context protocol used before `start()`.
    #[error("listener is not started; call start() before requesting contexts")]
    NotListening,

    /// Synchronous `get_context()` with zero configured prefixes. The async
    /// path deliberately skips this check.
    #[error("no prefixes are registered; add a prefix before calling get_context()")]
    NoPrefixes,

    /// A pending call handed to `end_get_context()` was issued by a
    /// different listener.
    #[error("pending call was not issued by this listener")]
    ForeignCall,

    /// `end_get_context()` invoked twice on the same pending call.
    #[error("end_get_context() was already called on this pending call")]
    AlreadyEnded,

    /// Prefix string rejected by [`PrefixCollection`](crate::prefix::PrefixCollection).
    #[error("invalid prefix '{prefix}': {reason}")]
    InvalidPrefix {
        /// The rejected prefix string.
        prefix: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Result type alias using [`ListenerError`].
pub type Result<T> = std::result::Result<T, ListenerError>;
