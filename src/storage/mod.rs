//! Persistence contract for the portal.
//!
//! The real deployment keeps every collection in browser local storage; this
//! crate only sees a namespaced get/set/remove surface plus a versioned JSON
//! envelope around each collection. A schema version mismatch or corrupt
//! payload falls back to the empty default rather than migrating — the demo
//! treats that as a reset, not a fault.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const STORAGE_PREFIX: &str = "evisa_";
pub const STORAGE_VERSION: &str = "1.0";

/// Collection keys shared by the portal stores.
pub mod keys {
    pub const VISA_TYPES: &str = "visa_types";
    pub const TEMPLATES: &str = "templates";
    pub const BINDINGS: &str = "bindings";
    pub const APPLICATIONS: &str = "applications";
}

/// Key-value surface the surrounding app provides (browser local storage in
/// the demo). Implementations are expected to be cheap to clone behind an
/// `Arc` and safe for the single-writer usage the portal assumes.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// Errors surfaced by the envelope layer. Reads never fail (they fall back
/// to defaults); only serializing a collection for writing can error.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to serialize collection '{key}'")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    version: String,
    data: T,
    #[allow(dead_code)]
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct EnvelopeRef<'a, T> {
    version: &'static str,
    data: &'a T,
    updated_at: DateTime<Utc>,
}

fn namespaced(key: &str) -> String {
    format!("{STORAGE_PREFIX}{key}")
}

/// Read a collection, returning the default when the key is absent, the
/// payload does not parse, or the schema version does not match.
pub fn load_collection<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(&namespaced(key)) else {
        return T::default();
    };

    match serde_json::from_str::<Envelope<T>>(&raw) {
        Ok(envelope) if envelope.version == STORAGE_VERSION => envelope.data,
        _ => T::default(),
    }
}

/// Persist a collection inside the versioned envelope.
pub fn save_collection<T, S>(store: &S, key: &str, data: &T) -> Result<(), StorageError>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let envelope = EnvelopeRef {
        version: STORAGE_VERSION,
        data,
        updated_at: Utc::now(),
    };
    let raw = serde_json::to_string(&envelope).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set(&namespaced(key), raw);
    Ok(())
}

/// In-memory store used by tests and the demo seeding path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let guard = self.entries.lock().expect("store mutex poisoned");
        guard.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut guard = self.entries.lock().expect("store mutex poisoned");
        guard.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        let mut guard = self.entries.lock().expect("store mutex poisoned");
        guard.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_returns_default_when_absent() {
        let store = MemoryStore::default();
        let loaded: Vec<String> = load_collection(&store, keys::TEMPLATES);
        assert!(loaded.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = MemoryStore::default();
        let values = vec!["AZ".to_string(), "TR".to_string()];
        save_collection(&store, keys::BINDINGS, &values).expect("save");
        let loaded: Vec<String> = load_collection(&store, keys::BINDINGS);
        assert_eq!(loaded, values);
    }

    #[test]
    fn version_mismatch_falls_back_to_default() {
        let store = MemoryStore::default();
        store.set(
            &namespaced(keys::BINDINGS),
            r#"{"version":"0.9","data":["stale"],"updated_at":"2024-01-01T00:00:00Z"}"#.to_string(),
        );
        let loaded: Vec<String> = load_collection(&store, keys::BINDINGS);
        assert!(loaded.is_empty());
    }

    #[test]
    fn corrupt_payload_falls_back_to_default() {
        let store = MemoryStore::default();
        store.set(&namespaced(keys::VISA_TYPES), "not json".to_string());
        let loaded: Vec<String> = load_collection(&store, keys::VISA_TYPES);
        assert!(loaded.is_empty());
    }
}
