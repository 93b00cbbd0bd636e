//! Client-local preferences that survive navigation.
//!
//! Not synchronized over the network. Read at session start and cleared when
//! the user explicitly leaves a room.

use crate::error::PreferencesError;
use crate::room::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Result type for preference operations.
pub type PreferencesResult<T> = Result<T, PreferencesError>;

/// Remembered identity and room details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub user_name: String,
    pub room_id: Option<String>,
    pub room_name: String,
    pub capacity: u32,
    pub is_host: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            user_name: "Anonymous".to_string(),
            room_id: None,
            room_name: "Room".to_string(),
            capacity: DEFAULT_CAPACITY,
            is_host: false,
        }
    }
}

/// Storage backend for [`Preferences`].
pub trait PreferenceStore: Send + Sync {
    /// Load stored preferences, or defaults if nothing is stored.
    fn load(&self) -> PreferencesResult<Preferences>;

    fn save(&self, preferences: &Preferences) -> PreferencesResult<()>;

    /// Forget everything (explicit "leave room").
    fn clear(&self) -> PreferencesResult<()>;
}

/// In-memory store for testing and ephemeral sessions.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    stored: RwLock<Option<Preferences>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> PreferencesResult<Preferences> {
        let stored = self
            .stored
            .read()
            .map_err(|e| PreferencesError::Other(format!("Lock error: {}", e)))?;
        Ok(stored.clone().unwrap_or_default())
    }

    fn save(&self, preferences: &Preferences) -> PreferencesResult<()> {
        let mut stored = self
            .stored
            .write()
            .map_err(|e| PreferencesError::Other(format!("Lock error: {}", e)))?;
        *stored = Some(preferences.clone());
        Ok(())
    }

    fn clear(&self) -> PreferencesResult<()> {
        let mut stored = self
            .stored
            .write()
            .map_err(|e| PreferencesError::Other(format!("Lock error: {}", e)))?;
        *stored = None;
        Ok(())
    }
}

/// JSON file store for native platforms.
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    /// Store preferences at `path`. The parent directory is created on save.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store in the default location.
    ///
    /// On Unix: `~/.local/share/sketchroom/preferences.json`
    /// On Windows: `%LOCALAPPDATA%\sketchroom\preferences.json`
    pub fn default_location() -> PreferencesResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| PreferencesError::Io("Could not determine home directory".to_string()))?;
        Ok(Self::new(base.join("sketchroom").join("preferences.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> PreferencesResult<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let json = fs::read_to_string(&self.path).map_err(|e| {
            PreferencesError::Io(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            PreferencesError::Serialization(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    fn save(&self, preferences: &Preferences) -> PreferencesResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                PreferencesError::Io(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_string_pretty(preferences)
            .map_err(|e| PreferencesError::Serialization(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| {
            PreferencesError::Io(format!("Failed to write {}: {}", self.path.display(), e))
        })
    }

    fn clear(&self) -> PreferencesResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                PreferencesError::Io(format!("Failed to delete {}: {}", self.path.display(), e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Preferences {
        Preferences {
            user_name: "Ann".to_string(),
            room_id: Some("ABCDEF123456".to_string()),
            room_name: "Sketches".to_string(),
            capacity: 3,
            is_host: true,
        }
    }

    #[test]
    fn test_memory_defaults_when_empty() {
        let store = MemoryPreferenceStore::new();
        let prefs = store.load().unwrap();
        assert_eq!(prefs.user_name, "Anonymous");
        assert_eq!(prefs.capacity, DEFAULT_CAPACITY);
        assert!(prefs.room_id.is_none());
    }

    #[test]
    fn test_memory_save_load_clear() {
        let store = MemoryPreferenceStore::new();
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), Preferences::default());
    }

    #[test]
    fn test_file_save_load() {
        let dir = tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path().join("nested").join("prefs.json"));
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn test_file_clear() {
        let dir = tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path().join("prefs.json"));
        store.save(&sample()).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.load().unwrap(), Preferences::default());
    }

    #[test]
    fn test_file_partial_json_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, r#"{"userName":"Bob"}"#).unwrap();
        let prefs = FilePreferenceStore::new(path).load().unwrap();
        assert_eq!(prefs.user_name, "Bob");
        assert_eq!(prefs.room_name, "Room");
    }

    #[test]
    fn test_file_corrupt_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "not json").unwrap();
        let result = FilePreferenceStore::new(path).load();
        assert!(matches!(result, Err(PreferencesError::Serialization(_))));
    }
}
