//! Address-prefix collection shared between a listener and the endpoint layer.

use std::sync::Mutex;

use crate::error::{ListenerError, Result};

/// The set of address prefixes (`"http://+:8080/"` style) a listener serves.
///
/// The endpoint layer interprets prefixes to route inbound connections; the
/// dispatch core itself only reads the count, which gates the synchronous
/// `get_context()` path. Validation here is shape-only: scheme and trailing
/// slash, nothing about hosts or wildcards.
#[derive(Debug, Default)]
pub struct PrefixCollection {
    prefixes: Mutex<Vec<String>>,
}

impl PrefixCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prefix. Duplicates are benign no-ops.
    pub fn add(&self, prefix: &str) -> Result<()> {
        if !prefix.starts_with("http://") && !prefix.starts_with("https://") {
            return Err(ListenerError::InvalidPrefix {
                prefix: prefix.to_string(),
                reason: "only http:// and https:// schemes are supported",
            });
        }
        if !prefix.ends_with('/') {
            return Err(ListenerError::InvalidPrefix {
                prefix: prefix.to_string(),
                reason: "prefix must end in '/'",
            });
        }
        let mut prefixes = self.prefixes.lock().unwrap();
        if !prefixes.iter().any(|p| p == prefix) {
            prefixes.push(prefix.to_string());
        }
        Ok(())
    }

    /// Remove a prefix. Returns whether it was present.
    pub fn remove(&self, prefix: &str) -> bool {
        let mut prefixes = self.prefixes.lock().unwrap();
        let before = prefixes.len();
        prefixes.retain(|p| p != prefix);
        prefixes.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.prefixes.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.lock().unwrap().is_empty()
    }

    /// Snapshot of the current prefixes.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.prefixes.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove() {
        let prefixes = PrefixCollection::new();
        prefixes.add("http://+:8080/").unwrap();
        prefixes.add("http://+:8080/").unwrap();
        assert_eq!(prefixes.len(), 1);
        assert!(prefixes.remove("http://+:8080/"));
        assert!(!prefixes.remove("http://+:8080/"));
        assert!(prefixes.is_empty());
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let prefixes = PrefixCollection::new();
        assert!(matches!(
            prefixes.add("ftp://host/"),
            Err(ListenerError::InvalidPrefix { .. })
        ));
        assert!(matches!(
            prefixes.add("http://host:8080"),
            Err(ListenerError::InvalidPrefix { .. })
        ));
    }
}
