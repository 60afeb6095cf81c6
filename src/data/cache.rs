//! Fingerprint-keyed cache for tables read by the API server.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
    time::SystemTime,
};

use anyhow::Result;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::data::read_csv_table;

/// Identity of a file's contents as seen by the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl Fingerprint {
    /// `None` when the file does not exist.
    pub fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

struct Entry<T> {
    fingerprint: Fingerprint,
    rows: Arc<Vec<T>>,
}

/// Parsed CSV tables memoised per path until the file's fingerprint changes.
pub struct TableCache<T> {
    entries: Mutex<HashMap<PathBuf, Entry<T>>>,
}

impl<T> Default for TableCache<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: DeserializeOwned> TableCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return cached rows if the file is unchanged, otherwise re-read it.
    /// A missing file yields an empty table and evicts any stale entry.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<Vec<T>>> {
        let Some(fingerprint) = Fingerprint::of(path) else {
            self.invalidate(path);
            return Ok(Arc::new(read_csv_table(path)?));
        };

        if let Some(entry) = self.lock().get(path) {
            if entry.fingerprint == fingerprint {
                return Ok(Arc::clone(&entry.rows));
            }
        }

        debug!(path = %path.display(), "loading table into cache");
        let rows = Arc::new(read_csv_table(path)?);
        self.lock().insert(
            path.to_path_buf(),
            Entry {
                fingerprint,
                rows: Arc::clone(&rows),
            },
        );
        Ok(rows)
    }

    pub fn invalidate(&self, path: &Path) {
        self.lock().remove(path);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        name: String,
        value: i64,
    }

    #[test]
    fn reuses_rows_until_the_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "name,value\na,1\n").unwrap();

        let cache = TableCache::<Row>::new();
        let first = cache.get_or_load(&path).unwrap();
        let second = cache.get_or_load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        std::fs::write(&path, "name,value\na,1\nbb,22\n").unwrap();
        let third = cache.get_or_load(&path).unwrap();
        assert_eq!(third.len(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn explicit_invalidation_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "name,value\na,1\n").unwrap();

        let cache = TableCache::<Row>::new();
        let first = cache.get_or_load(&path).unwrap();
        cache.invalidate(&path);
        assert!(cache.is_empty());
        let second = cache.get_or_load(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn missing_file_reads_empty_and_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::<Row>::new();
        let rows = cache.get_or_load(&dir.path().join("absent.csv")).unwrap();
        assert!(rows.is_empty());
        assert!(cache.is_empty());
    }
}
