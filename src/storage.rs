/// Persistent key-value storage seam.
///
/// The browser offers two scopes: a small-quota synced scope (settings, lock
/// state, unlocked domains) and a larger local scope (vault, activity stamps,
/// undo batches). The core sees both through the same trait; write failures
/// are logged, never retried.
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Storage keys, shared with the data layout the extension persists.
pub mod keys {
    pub const LOCKED_TABS: &str = "lockedTabs";
    pub const LOCKED_PATTERNS: &str = "lockedUrls";
    pub const UNLOCKED_DOMAINS: &str = "unlockedDomains";
    pub const SETTINGS: &str = "settings";
    pub const TAB_VAULT: &str = "tabVault";
    pub const TAB_ACTIVITY: &str = "tabActivity";
    pub const LAST_DECLUTTER: &str = "lastDeclutterAction";
}

#[derive(Debug, Error)]
#[error("storage operation failed: {0}")]
pub struct StorageError(pub String);

/// One storage scope. `get` misses are `None`; mutations may fail, and the
/// caller decides whether that matters.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Deserialize a stored value, treating a miss or a shape mismatch as absent.
pub fn load<T, S>(store: &S, key: &str) -> Option<T>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let value = store.get(key)?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("couldn't decode stored value under {key:?}: {e}");
            None
        }
    }
}

/// Serialize and write a value, logging (not propagating) failures.
pub fn save<T, S>(store: &mut S, key: &str, value: &T)
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    match serde_json::to_value(value) {
        Ok(json) => {
            if let Err(e) = store.set(key, json) {
                log::error!("couldn't persist {key:?}: {e}");
            }
        }
        Err(e) => log::error!("couldn't serialize {key:?}: {e}"),
    }
}

/// In-memory store used in tests and by embedders that buffer writes
/// themselves before flushing to the browser storage area.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab_data::LockedTab;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        let mut locked = HashMap::new();
        locked.insert(
            42,
            LockedTab {
                original_url: "https://example.com".to_string(),
                password_hash: "abc".to_string(),
                locked_at: 1.0,
            },
        );

        save(&mut store, keys::LOCKED_TABS, &locked);
        let restored: HashMap<i32, LockedTab> = load(&store, keys::LOCKED_TABS).unwrap();

        assert_eq!(restored, locked);
    }

    #[test]
    fn test_load_missing_key() {
        let store = MemoryStore::new();
        let missing: Option<Vec<String>> = load(&store, keys::UNLOCKED_DOMAINS);
        assert!(missing.is_none());
    }

    #[test]
    fn test_load_shape_mismatch_is_none() {
        let mut store = MemoryStore::new();
        store
            .set(keys::TAB_ACTIVITY, Value::String("oops".to_string()))
            .unwrap();

        let parsed: Option<HashMap<i32, f64>> = load(&store, keys::TAB_ACTIVITY);
        assert!(parsed.is_none());
    }

    #[test]
    fn test_remove() {
        let mut store = MemoryStore::new();
        save(&mut store, keys::TAB_VAULT, &vec!["x"]);
        store.remove(keys::TAB_VAULT).unwrap();
        assert!(store.get(keys::TAB_VAULT).is_none());
    }
}
