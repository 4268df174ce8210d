use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Strongly typed request-context identifier backed by ULID.
///
/// Context identity is what the registry and queues key on: two contexts
/// with structurally identical request data are still distinct entries.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct ContextId(pub ulid::Ulid);

/// Strongly typed transport-connection identifier backed by ULID.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct ConnectionId(pub ulid::Ulid);

/// Strongly typed listener identifier backed by ULID.
///
/// Stamped into every [`PendingCall`](crate::pending::PendingCall) so that
/// `end_get_context` can reject calls issued by a different listener.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct ListenerId(pub ulid::Ulid);

macro_rules! impl_ulid_id {
    ($name:ident) => {
        impl $name {
            pub fn new() -> Self {
                Self(ulid::Ulid::new())
            }

            pub fn from_ulid(id: ulid::Ulid) -> Self {
                Self(id)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(ulid::Ulid::from_string(s)?))
            }
        }
    };
}

impl_ulid_id!(ContextId);
impl_ulid_id!(ConnectionId);
impl_ulid_id!(ListenerId);
