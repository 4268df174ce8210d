//! Passthrough listener configuration.
//!
//! The core stores these values and exposes them to collaborators; it never
//! evaluates credentials itself. Scheme selection for an individual request
//! is delegated through [`AuthSchemeSelector`].

use std::sync::Arc;

use bitflags::bitflags;

use crate::context::RequestContext;

bitflags! {
    /// Authentication schemes a listener advertises to its connection layer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AuthSchemes: u8 {
        const NONE = 0;
        const ANONYMOUS = 1 << 0;
        const BASIC = 1 << 1;
        const DIGEST = 1 << 2;
        const NTLM = 1 << 3;
        const NEGOTIATE = 1 << 4;
    }
}

impl Default for AuthSchemes {
    fn default() -> Self {
        Self::ANONYMOUS
    }
}

/// Per-request scheme selector, consulted by the connection layer when a
/// listener serves mixed authentication policies.
///
/// Runs on the connection layer's thread; implementations must be cheap and
/// must not call back into the listener.
pub type AuthSchemeSelector = Arc<dyn Fn(&RequestContext) -> AuthSchemes + Send + Sync>;

/// Configuration snapshot owned by a listener.
///
/// All fields are consumed by collaborators (authentication, response
/// writing); the dispatch core itself only stores them.
#[derive(Clone, Default)]
pub struct ListenerConfig {
    /// Schemes advertised when no selector is installed.
    pub auth_schemes: AuthSchemes,
    /// Optional per-request scheme selector.
    pub auth_selector: Option<AuthSchemeSelector>,
    /// Realm string sent in authentication challenges.
    pub realm: Option<String>,
    /// Swallow write failures when responding on a dead connection.
    pub ignore_write_exceptions: bool,
    /// Allow connection-scoped legacy (NTLM-style) authentication reuse.
    pub unsafe_legacy_auth: bool,
}

impl std::fmt::Debug for ListenerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerConfig")
            .field("auth_schemes", &self.auth_schemes)
            .field("auth_selector", &self.auth_selector.is_some())
            .field("realm", &self.realm)
            .field("ignore_write_exceptions", &self.ignore_write_exceptions)
            .field("unsafe_legacy_auth", &self.unsafe_legacy_auth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scheme_is_anonymous() {
        assert_eq!(AuthSchemes::default(), AuthSchemes::ANONYMOUS);
    }

    #[test]
    fn test_schemes_combine() {
        let schemes = AuthSchemes::BASIC | AuthSchemes::DIGEST;
        assert!(schemes.contains(AuthSchemes::BASIC));
        assert!(!schemes.contains(AuthSchemes::NTLM));
    }
}
