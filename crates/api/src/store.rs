use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use extract::ClaimRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub parsed: ClaimRecord,
}

impl StoredEntry {
    pub fn new(filename: impl Into<String>, parsed: ClaimRecord) -> Self {
        Self {
            filename: filename.into(),
            created_at: Utc::now(),
            parsed,
        }
    }
}

/// Parsed documents keyed by document id, optionally mirrored to a JSON file.
pub struct ClaimStore {
    entries: DashMap<String, StoredEntry>,
    path: Option<PathBuf>,
    // Serializes whole-file writes; map access itself is lock-free.
    write_lock: Mutex<()>,
}

impl ClaimStore {
    pub fn in_memory() -> Self {
        Self {
            entries: DashMap::new(),
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::in_memory()
        }
    }

    /// Open a file-backed store, loading whatever the file holds.
    ///
    /// A missing or unreadable file gives an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self::with_path(path);
        match store.load() {
            Ok(count) => info!(path = ?store.path, documents = count, "Loaded claim store"),
            Err(e) => warn!(path = ?store.path, error = %e, "Starting with an empty claim store"),
        }
        store
    }

    /// Replace the in-memory entries with the file contents.
    pub fn load(&self) -> Result<usize> {
        let Some(path) = &self.path else {
            return Ok(0);
        };
        if !path.exists() {
            return Ok(0);
        }

        let json = std::fs::read_to_string(path)
            .context(format!("Failed to read store file: {:?}", path))?;
        let data: BTreeMap<String, StoredEntry> = serde_json::from_str(&json)
            .context(format!("Failed to parse store file: {:?}", path))?;

        self.entries.clear();
        let count = data.len();
        for (id, entry) in data {
            self.entries.insert(id, entry);
        }
        Ok(count)
    }

    /// Insert or replace an entry. Persistence failures are logged, not returned.
    pub fn save(&self, document_id: &str, entry: StoredEntry, persist: bool) {
        self.entries.insert(document_id.to_string(), entry);
        if persist {
            self.persist_logged();
        }
    }

    pub fn get(&self, document_id: &str) -> Option<StoredEntry> {
        self.entries.get(document_id).map(|r| r.value().clone())
    }

    /// Remove an entry, persisting when it existed.
    pub fn delete(&self, document_id: &str) -> bool {
        let existed = self.entries.remove(document_id).is_some();
        if existed && self.path.is_some() {
            self.persist_logged();
        }
        existed
    }

    /// Document ids in sorted order.
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the whole store to `<path>.tmp`, then rename it over `<path>`.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Store write lock poisoned"))?;

        let snapshot: BTreeMap<String, StoredEntry> = self
            .entries
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        let json = serde_json::to_string_pretty(&snapshot).context("Failed to serialize store")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create store directory: {:?}", parent))?;
        }
        let tmp = tmp_path(path);
        std::fs::write(&tmp, json).context(format!("Failed to write store file: {:?}", tmp))?;
        std::fs::rename(&tmp, path).context(format!("Failed to replace store file: {:?}", path))?;
        Ok(())
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            warn!(path = ?self.path, error = %e, "Failed to persist claim store");
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::Patient;

    fn entry(name: &str) -> StoredEntry {
        StoredEntry::new(
            "claim.txt",
            ClaimRecord {
                patient: Patient {
                    name: Some(name.to_string()),
                    age: None,
                },
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_save_get_delete() {
        let store = ClaimStore::in_memory();
        store.save("b", entry("Ben"), false);
        store.save("a", entry("Ada"), true);

        assert_eq!(store.list(), vec!["a", "b"]);
        assert_eq!(store.get("a").unwrap().parsed.patient.name.as_deref(), Some("Ada"));
        assert!(store.get("missing").is_none());

        assert!(store.delete("a"));
        assert!(!store.delete("a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = ClaimStore::with_path(&path);
        store.save("doc-1", entry("Ada"), true);
        assert!(path.exists());
        assert!(!tmp_path(&path).exists());

        let reopened = ClaimStore::open(&path);
        assert_eq!(reopened.get("doc-1"), store.get("doc-1"));
    }

    #[test]
    fn test_unpersisted_save_stays_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = ClaimStore::with_path(&path);
        store.save("doc-1", entry("Ada"), false);
        assert!(!path.exists());
    }

    #[test]
    fn test_delete_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = ClaimStore::with_path(&path);
        store.save("doc-1", entry("Ada"), true);
        store.save("doc-2", entry("Ben"), true);
        store.delete("doc-1");

        assert_eq!(ClaimStore::open(&path).list(), vec!["doc-2"]);
    }

    #[test]
    fn test_corrupt_file_gives_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = ClaimStore::open(&path);
        assert!(store.is_empty());
        assert!(store.load().is_err());
    }
}
