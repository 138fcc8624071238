use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

const STORE_VERSION: u32 = 1;
const APP_DIR: &str = "judstat_terminal";
const SESSION_FILE: &str = "session.json";

/// Durable string key/value storage for the session.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Vec<String>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock_entries(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock_entries(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock_entries(&self.entries).remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        lock_entries(&self.entries).keys().cloned().collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StoreFile {
    version: u32,
    entries: BTreeMap<String, String>,
}

/// JSON file store. Every write rewrites the whole file through a tmp file + rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_store_file(&path).map(|f| f.entries).unwrap_or_default();
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let Some(dir) = self.path.parent() else {
            return Ok(());
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("create session dir {}", dir.display()))?;
        let file = StoreFile {
            version: STORE_VERSION,
            entries: entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file).context("serialize session store")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).context("write session store")?;
        fs::rename(&tmp, &self.path).context("swap session store")?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock_entries(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock_entries(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = lock_entries(&self.entries);
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries)
    }

    fn keys(&self) -> Vec<String> {
        lock_entries(&self.entries).keys().cloned().collect()
    }
}

fn load_store_file(path: &Path) -> Option<StoreFile> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<StoreFile>(&raw) {
        Ok(file) if file.version == STORE_VERSION => Some(file),
        Ok(file) => {
            warn!(version = file.version, "ignoring session store with unknown version");
            None
        }
        Err(err) => {
            warn!(error = %err, path = %path.display(), "ignoring unreadable session store");
            None
        }
    }
}

fn lock_entries(
    entries: &Mutex<BTreeMap<String, String>>,
) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
    // A panic while holding the lock leaves the map itself intact.
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn default_session_dir() -> Option<PathBuf> {
    // Prefer XDG data.
    if let Ok(base) = std::env::var("XDG_DATA_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".local").join("share").join(APP_DIR))
}

pub fn session_file_in(dir: &Path) -> PathBuf {
    dir.join(SESSION_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "judstat_persist_{name}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = scratch_dir("reopen");
        let path = session_file_in(&dir);
        {
            let store = FileStore::open(&path);
            store.set("accessToken", "abc").unwrap();
            store.set("user", "{\"id\":1}").unwrap();
            store.remove("user").unwrap();
        }
        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("accessToken").as_deref(), Some("abc"));
        assert!(reopened.get("user").is_none());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = scratch_dir("corrupt");
        fs::create_dir_all(&dir).unwrap();
        let path = session_file_in(&dir);
        fs::write(&path, "{not json").unwrap();
        let store = FileStore::open(&path);
        assert!(store.keys().is_empty());
        let _ = fs::remove_dir_all(&dir);
    }
}
