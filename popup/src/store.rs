//! Flat key-value storage with change notifications.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use ratepivot_common::{RatePivotError, Result};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Capacity of the change-notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// String-keyed blob storage, shared between the converter and whoever edits
/// its settings.
pub trait KeyValueStore: Send + Sync {
    /// Read the blob stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob under `key` and notify subscribers.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Receive the key of every subsequent write.
    fn subscribe(&self) -> broadcast::Receiver<String>;
}

/// In-memory store.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    changes: broadcast::Sender<String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Create a store holding a single entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.entries.write().insert(key.to_string(), value.to_string());
        store
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        // No subscribers is fine.
        let _ = self.changes.send(key.to_string());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}

/// Store persisted as one JSON object file.
///
/// A missing file is an empty store. Values are kept as JSON strings; a
/// hand-edited non-string value is handed back as its JSON text. Writes made
/// by other processes are only reported once [`JsonFileStore::watch`] runs.
pub struct JsonFileStore {
    path: PathBuf,
    /// Last contents this instance wrote or observed. Held while writing.
    snapshot: Mutex<Option<Map<String, Value>>>,
    changes: broadcast::Sender<String>,
}

impl JsonFileStore {
    /// Open (lazily) the store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            path: path.into(),
            snapshot: Mutex::new(None),
            changes,
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and notify subscribers of every key whose value
    /// differs from the last snapshot.
    ///
    /// The first call only records the baseline. Returns the changed keys.
    pub fn poll_changes(&self) -> Result<Vec<String>> {
        let mut snapshot = self.snapshot.lock();
        let current = self.read_all()?;

        let changed = match snapshot.as_ref() {
            Some(previous) => changed_keys(previous, &current),
            None => Vec::new(),
        };
        *snapshot = Some(current);
        drop(snapshot);

        for key in &changed {
            debug!(path = %self.path.display(), key = %key, "Store changed on disk");
            let _ = self.changes.send(key.clone());
        }
        Ok(changed)
    }

    /// Poll the file every `period` so writes from other processes reach
    /// subscribers.
    ///
    /// The baseline is taken before this returns. The task ends once the
    /// store is dropped.
    pub fn watch(store: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        if let Err(e) = store.poll_changes() {
            warn!(path = %store.path.display(), error = %e, "Could not read store baseline");
        }

        let store: Weak<Self> = Arc::downgrade(store);
        tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            timer.tick().await;

            loop {
                timer.tick().await;
                let Some(store) = store.upgrade() else { break };
                if let Err(e) = store.poll_changes() {
                    // Usually a write from another process caught half way.
                    warn!(path = %store.path.display(), error = %e, "Could not poll store");
                }
            }
        })
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            other => Err(RatePivotError::CorruptStore {
                path: self.path.display().to_string(),
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.read_all()?;
        Ok(entries.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        {
            let mut snapshot = self.snapshot.lock();
            let mut entries = self.read_all()?;
            entries.insert(key.to_string(), Value::String(value.to_string()));

            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
            // Our own write is announced below, not again by the watcher.
            *snapshot = Some(entries);
        }

        debug!(path = %self.path.display(), key, "Stored value");
        let _ = self.changes.send(key.to_string());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}

fn changed_keys(previous: &Map<String, Value>, current: &Map<String, Value>) -> Vec<String> {
    let keys: BTreeSet<&String> = previous.keys().chain(current.keys()).collect();
    keys.into_iter()
        .filter(|key| previous.get(*key) != current.get(*key))
        .cloned()
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_memory_store_notifies() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store.set("currencyConfig", "{}").unwrap();

        assert_eq!(rx.recv().await.unwrap(), "currencyConfig");
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/store.json"));

        assert_eq!(store.get("anything").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/store.json");

        JsonFileStore::new(&path).set("a", "1").unwrap();
        JsonFileStore::new(&path).set("b", "{\"x\":2}").unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("{\"x\":2}"));
    }

    #[test]
    fn test_file_store_hand_edited_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{ "currencyConfig": { "numFields": 2 } }"#).unwrap();

        let store = JsonFileStore::new(&path);
        let blob = store.get("currencyConfig").unwrap().unwrap();
        let value: Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(value["numFields"], 2);
    }

    #[tokio::test]
    async fn test_file_store_sees_other_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let popup = JsonFileStore::new(&path);
        popup.set("theme", "dark").unwrap();
        let mut rx = popup.subscribe();

        assert!(popup.poll_changes().unwrap().is_empty());

        JsonFileStore::new(&path)
            .set("currencyConfig", r#"{"numFields":2}"#)
            .unwrap();

        assert_eq!(popup.poll_changes().unwrap(), vec!["currencyConfig"]);
        assert_eq!(rx.recv().await.unwrap(), "currencyConfig");
        assert!(popup.poll_changes().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_own_write_announced_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("store.json"));
        store.poll_changes().unwrap();

        store.set("currencyConfig", "{}").unwrap();

        assert!(store.poll_changes().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watch_reports_other_process_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let popup = Arc::new(JsonFileStore::new(&path));
        let mut rx = popup.subscribe();
        let watcher = JsonFileStore::watch(&popup, Duration::from_millis(20));

        let settings = JsonFileStore::new(&path);
        settings.set("currencyConfig", r#"{"numFields":1}"#).unwrap();

        let key = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("watcher should report the write")
            .unwrap();
        assert_eq!(key, "currencyConfig");

        drop(popup);
        tokio::time::timeout(Duration::from_secs(5), watcher)
            .await
            .expect("watcher should stop with the store")
            .unwrap();
    }

    #[test]
    fn test_file_store_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let err = JsonFileStore::new(&path).get("k").unwrap_err();
        assert_eq!(err.error_code(), "CORRUPT_STORE");
    }
}
