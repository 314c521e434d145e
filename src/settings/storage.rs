//! Durable key-value storage behind the settings store.
//!
//! Each scalar setting is its own entry; the saved setups list is a single
//! entry holding a JSON array.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::error::{Result, SettingsError};

/// Directory under the home directory holding Flow's files.
pub const DATA_DIR_NAME: &str = ".flow";

/// File name of the JSON settings store.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// A flat key-value namespace with immediately durable writes.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key` and makes it durable before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be persisted.
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
}

// ============================================================================
// JsonFileStore
// ============================================================================

/// Key-value store backed by a single JSON object file.
///
/// The whole file is rewritten on every `set`, via a temporary file and a
/// rename so a crash never leaves a half-written document behind.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl JsonFileStore {
    /// Opens the store at `path`.
    ///
    /// A missing, unreadable or malformed file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Map::new(),
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(entries)) => entries,
                Ok(_) => {
                    tracing::warn!(path = %path.display(), "settings file is not a JSON object, using defaults");
                    Map::new()
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse settings file, using defaults");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read settings file, using defaults");
                Map::new()
            }
        };

        Self { path, entries }
    }

    /// Returns `~/.flow/settings.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(SettingsError::HomeDirectoryNotFound)?;
        Ok(home.join(DATA_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrites the whole document.
    ///
    /// Blocking I/O. The daemon calls this while holding the settings write
    /// lock, so the document must stay small (a few hundred bytes today).
    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// Non-durable store for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
