//! Persistent per-table preferences.
//!
//! The store never fails outward: any backend, serialization or lock error
//! is logged and the caller gets its default (for reads) or `false` (for
//! writes and resets). Values are wrapped in a versioned, timestamped
//! envelope so newer builds can keep reading older entries.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::column::ColumnConfig;
use super::sort::SortConfig;

/// Prefix shared by every table preference key.
pub const TABLE_KEY_PREFIX: &str = "canagrosa_table_";

/// Key of the navigation layout mode (sidebar/header) preference.
pub const LAYOUT_MODE_KEY: &str = "canagrosa_layout_mode";

/// Envelope schema version written by this build.
pub const PREFERENCES_VERSION: u32 = 1;

/// Errors raised by a key-value backend. Never escapes [`PreferenceStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("storage is corrupt: {0}")]
    Corrupt(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A string key-value persistence substrate.
pub trait KeyValueBackend: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// A single JSON document on disk mapping keys to string values.
///
/// The whole document is rewritten on each change through a temporary file
/// and a rename, so a crash mid-write leaves the previous version intact.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileBackend {
    /// Open (or lazily create) the document at `path`.
    ///
    /// A corrupt document is logged and treated as empty; it is replaced on
    /// the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable preference file");
                BTreeMap::new()
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "Opened preference file");
        Self { path, entries }
    }

    /// Default location: `<data_local_dir>/canagrosa/preferences.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("canagrosa").join("preferences.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    fn flush(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        trace!(path = %self.path.display(), "Flushed preference file");
        Ok(())
    }
}

impl KeyValueBackend for JsonFileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Versioned wrapper around every persisted value.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    /// Milliseconds since the Unix epoch at write time.
    timestamp: u64,
    data: T,
}

/// Everything persisted for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePreferences {
    #[serde(default)]
    pub columns_config: Vec<ColumnConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_order: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortConfig>,
}

/// Typed, failure-tolerant access to a shared [`KeyValueBackend`].
///
/// Cloning is cheap; clones share the same backend.
#[derive(Clone)]
pub struct PreferenceStore {
    backend: Arc<Mutex<Box<dyn KeyValueBackend>>>,
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore").finish_non_exhaustive()
    }
}

impl PreferenceStore {
    pub fn new(backend: impl KeyValueBackend + 'static) -> Self {
        Self {
            backend: Arc::new(Mutex::new(Box::new(backend))),
        }
    }

    /// A store that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// The namespaced key of a table.
    pub fn table_key(table_id: &str) -> String {
        format!("{}{}", TABLE_KEY_PREFIX, table_id)
    }

    /// Serialize and store `value` under `key`. Returns `false` on failure.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let envelope = Envelope {
            version: PREFERENCES_VERSION,
            timestamp: now_millis(),
            data: value,
        };
        let serialized = match serde_json::to_string(&envelope) {
            Ok(s) => s,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize preference");
                return false;
            }
        };

        let Ok(mut backend) = self.backend.lock() else {
            warn!(key, "Preference backend lock poisoned; not saving");
            return false;
        };
        match backend.set(key, &serialized) {
            Ok(()) => {
                trace!(key, "Saved preference");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "Failed to save preference");
                false
            }
        }
    }

    /// Load the value under `key`, or `default` if it is missing or unreadable.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = {
            let Ok(backend) = self.backend.lock() else {
                warn!(key, "Preference backend lock poisoned; using default");
                return default;
            };
            match backend.get(key) {
                Ok(Some(raw)) => raw,
                Ok(None) => return default,
                Err(e) => {
                    warn!(key, error = %e, "Failed to read preference");
                    return default;
                }
            }
        };

        match serde_json::from_str::<Envelope<T>>(&raw) {
            Ok(envelope) => {
                if envelope.version > PREFERENCES_VERSION {
                    debug!(key, version = envelope.version, "Read preference from a newer schema");
                }
                envelope.data
            }
            // Entries written before the envelope existed
            Err(_) => match serde_json::from_str::<T>(&raw) {
                Ok(data) => data,
                Err(e) => {
                    warn!(key, error = %e, "Discarding corrupt preference");
                    default
                }
            },
        }
    }

    /// Remove `key`. Returns `false` on failure.
    pub fn reset(&self, key: &str) -> bool {
        let Ok(mut backend) = self.backend.lock() else {
            warn!(key, "Preference backend lock poisoned; not resetting");
            return false;
        };
        match backend.remove(key) {
            Ok(()) => {
                debug!(key, "Reset preference");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "Failed to reset preference");
                false
            }
        }
    }

    /// Whether anything is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.backend
            .lock()
            .ok()
            .and_then(|backend| backend.get(key).ok().flatten())
            .is_some()
    }

    pub fn load_table(&self, table_id: &str) -> TablePreferences {
        self.load(&Self::table_key(table_id), TablePreferences::default())
    }

    pub fn save_table(&self, table_id: &str, prefs: &TablePreferences) -> bool {
        self.save(&Self::table_key(table_id), prefs)
    }

    pub fn reset_table(&self, table_id: &str) -> bool {
        self.reset(&Self::table_key(table_id))
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::sort::SortDirection;
    use tempfile::tempdir;

    struct FailingBackend;

    impl KeyValueBackend for FailingBackend {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
    }

    fn sample_prefs() -> TablePreferences {
        TablePreferences {
            columns_config: vec![ColumnConfig {
                id: "ESTADO".to_string(),
                width: Some(250),
                visible: Some(true),
            }],
            column_order: Some(vec!["ESTADO".to_string(), "ID".to_string()]),
            sort: Some(SortConfig::new("ID", SortDirection::Desc)),
        }
    }

    #[test]
    fn test_table_key_is_namespaced() {
        assert_eq!(PreferenceStore::table_key("clients"), "canagrosa_table_clients");
    }

    #[test]
    fn test_save_and_load_table() {
        let store = PreferenceStore::in_memory();
        assert!(store.save_table("clients", &sample_prefs()));
        assert_eq!(store.load_table("clients"), sample_prefs());
        // Other tables are unaffected
        assert_eq!(store.load_table("samples"), TablePreferences::default());
    }

    #[test]
    fn test_persisted_value_has_version_and_timestamp() {
        let store = PreferenceStore::in_memory();
        store.save_table("clients", &sample_prefs());

        let raw = store
            .backend
            .lock()
            .unwrap()
            .get("canagrosa_table_clients")
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["version"], PREFERENCES_VERSION);
        assert!(json["timestamp"].as_u64().unwrap() > 0);
        assert_eq!(json["data"]["columnsConfig"][0]["id"], "ESTADO");
    }

    #[test]
    fn test_reset_removes_entry() {
        let store = PreferenceStore::in_memory();
        store.save_table("clients", &sample_prefs());
        assert!(store.contains("canagrosa_table_clients"));

        assert!(store.reset_table("clients"));
        assert!(!store.contains("canagrosa_table_clients"));
        assert_eq!(store.load_table("clients"), TablePreferences::default());
    }

    #[test]
    fn test_corrupt_entry_returns_default() {
        let mut backend = MemoryBackend::new();
        backend.set("canagrosa_table_clients", "{not json").unwrap();
        let store = PreferenceStore::new(backend);
        assert_eq!(store.load_table("clients"), TablePreferences::default());
    }

    #[test]
    fn test_unversioned_entry_is_read() {
        let mut backend = MemoryBackend::new();
        backend
            .set(
                "canagrosa_table_users",
                r#"{"columnsConfig":[{"id":"EMAIL","visible":false}]}"#,
            )
            .unwrap();
        let store = PreferenceStore::new(backend);
        let prefs = store.load_table("users");
        assert_eq!(prefs.columns_config[0].visible, Some(false));
        assert_eq!(prefs.columns_config[0].width, None);
    }

    #[test]
    fn test_newer_version_is_read_when_compatible() {
        let mut backend = MemoryBackend::new();
        backend
            .set(
                "canagrosa_table_users",
                r#"{"version":9,"timestamp":1,"data":{"columnsConfig":[],"sort":{"column":"ID","direction":"asc"},"density":"compact"}}"#,
            )
            .unwrap();
        let store = PreferenceStore::new(backend);
        let prefs = store.load_table("users");
        assert_eq!(prefs.sort, Some(SortConfig::new("ID", SortDirection::Asc)));
    }

    #[test]
    fn test_failing_backend_never_errors() {
        let store = PreferenceStore::new(FailingBackend);
        assert!(!store.save_table("clients", &sample_prefs()));
        assert_eq!(store.load_table("clients"), TablePreferences::default());
        assert!(!store.reset_table("clients"));
        assert_eq!(store.load("anything", 42u32), 42);
    }

    #[test]
    fn test_clones_share_backend() {
        let store = PreferenceStore::in_memory();
        let other = store.clone();
        store.save(LAYOUT_MODE_KEY, &"header");
        assert_eq!(other.load(LAYOUT_MODE_KEY, String::new()), "header");
    }

    #[test]
    fn test_json_file_backend_persists_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs").join("preferences.json");

        let store = PreferenceStore::new(JsonFileBackend::open(&path));
        assert!(store.save_table("samples", &sample_prefs()));
        drop(store);

        let reopened = PreferenceStore::new(JsonFileBackend::open(&path));
        assert_eq!(reopened.load_table("samples"), sample_prefs());

        assert!(reopened.reset_table("samples"));
        let again = PreferenceStore::new(JsonFileBackend::open(&path));
        assert_eq!(again.load_table("samples"), TablePreferences::default());
    }

    #[test]
    fn test_json_file_backend_tolerates_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "garbage").unwrap();

        let backend = JsonFileBackend::open(&path);
        assert_eq!(backend.get("anything").unwrap(), None);

        let store = PreferenceStore::new(backend);
        assert!(store.save(LAYOUT_MODE_KEY, &"sidebar"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains(LAYOUT_MODE_KEY));
    }
}
