//! Lazily-instantiated named object collection.
//!
//! Server-scoped companion to the listener: a name → object registry where
//! each entry is built on first access by a registered factory, never before.
//! Instantiated state can be serialized to bytes and restored; restored
//! entries come back pre-instantiated.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Factory producing an object instance on first access.
pub type ObjectFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// On-disk form of a collection snapshot.
#[derive(Serialize, Deserialize)]
struct PersistedObjects {
    objects: BTreeMap<String, Value>,
}

enum StaticItem {
    /// Not yet accessed; the cell fills from the factory on first `get`.
    Lazy {
        factory: ObjectFactory,
        instance: OnceCell<Value>,
    },
    /// Restored from serialized form, already instantiated.
    Eager(Value),
}

impl StaticItem {
    fn instance(&self) -> Value {
        match self {
            StaticItem::Lazy { factory, instance } => {
                instance.get_or_init(|| factory()).clone()
            }
            StaticItem::Eager(value) => value.clone(),
        }
    }

    fn instantiated(&self) -> Option<Value> {
        match self {
            StaticItem::Lazy { instance, .. } => instance.get().cloned(),
            StaticItem::Eager(value) => Some(value.clone()),
        }
    }
}

/// Collection of named, lazily-instantiated objects.
///
/// `BTreeMap` keeps serialization output stable across runs.
#[derive(Default)]
pub struct StaticObjects {
    objects: Mutex<BTreeMap<String, StaticItem>>,
}

impl StaticObjects {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous entry.
    pub fn register(&self, name: &str, factory: ObjectFactory) {
        self.objects.lock().unwrap().insert(
            name.to_string(),
            StaticItem::Lazy {
                factory,
                instance: OnceCell::new(),
            },
        );
    }

    /// Fetch the object under `name`, instantiating it on first access.
    /// Returns `None` for unknown names.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.objects.lock().unwrap().get(name).map(StaticItem::instance)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.lock().unwrap().is_empty()
    }

    /// Serialize the collection to bytes. Entries never accessed are
    /// instantiated first, so the output covers the full collection.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        let snapshot = PersistedObjects {
            objects: objects
                .iter()
                .map(|(name, item)| (name.clone(), item.instance()))
                .collect(),
        };
        serde_json::to_vec(&snapshot)
    }

    /// Restore a collection from [`to_bytes`](Self::to_bytes) output. All
    /// restored entries are pre-instantiated.
    pub fn from_bytes(data: &[u8]) -> serde_json::Result<Self> {
        let snapshot: PersistedObjects = serde_json::from_slice(data)?;
        let objects = snapshot
            .objects
            .into_iter()
            .map(|(name, value)| (name, StaticItem::Eager(value)))
            .collect();
        Ok(Self {
            objects: Mutex::new(objects),
        })
    }

    /// Snapshot of entries that have been instantiated so far.
    #[must_use]
    pub fn instantiated(&self) -> BTreeMap<String, Value> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(name, item)| item.instantiated().map(|v| (name.clone(), v)))
            .collect()
    }
}
