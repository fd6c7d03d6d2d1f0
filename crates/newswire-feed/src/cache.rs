//! Result cache
//!
//! Finished query results are stored as one JSON file per query
//! fingerprint. A corrupt or unreadable entry is logged and treated as a
//! miss, never surfaced as an error; only backend failures (an unwritable
//! directory) abort an operation.

use crate::error::{FeedError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Aggregate size of the cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
}

/// Fingerprint-keyed store of serialized query results.
pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    /// Open a cache rooted at `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Open the per-user default cache directory.
    pub fn open_default() -> Result<Self> {
        let base = dirs::cache_dir()
            .ok_or_else(|| FeedError::cache("could not determine the user cache directory"))?;
        Self::new(base.join("newswire").join("results"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{}.json", fingerprint))
    }

    /// Look up a cached result. Any failure to read or decode the entry is
    /// a miss.
    pub fn get<T: DeserializeOwned>(&self, fingerprint: &str) -> Option<T> {
        let path = self.entry_path(fingerprint);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable cache entry, treating as a miss");
                return None;
            },
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(fingerprint, "Cache hit");
                Some(value)
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt cache entry, treating as a miss");
                None
            },
        }
    }

    /// Store a result under its fingerprint, replacing any previous entry.
    pub fn set<T: Serialize>(&self, fingerprint: &str, value: &T) -> Result<()> {
        let path = self.entry_path(fingerprint);
        let bytes = serde_json::to_vec(value)?;
        fs::write(&path, bytes)?;
        debug!(fingerprint, "Cached result");
        Ok(())
    }

    /// Remove one entry; returns whether it existed.
    pub fn remove(&self, fingerprint: &str) -> Result<bool> {
        match fs::remove_file(self.entry_path(fingerprint)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every entry; returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.entry_paths()? {
            fs::remove_file(&path)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Remove entries last written more than `days` days ago; returns how
    /// many were removed.
    pub fn prune_older_than(&self, days: u64) -> Result<usize> {
        let cutoff = SystemTime::now() - Duration::from_secs(days * 24 * 60 * 60);
        let mut removed = 0;
        for path in self.entry_paths()? {
            let modified = fs::metadata(&path)?.modified()?;
            if modified < cutoff {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        for path in self.entry_paths()? {
            stats.entries += 1;
            stats.bytes += fs::metadata(&path)?.len();
        }
        Ok(stats)
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::table::DataTable;
    use tempfile::TempDir;

    fn sample_table() -> DataTable {
        let mut t = DataTable::empty(&["id", "value"]);
        t.rows.push(vec!["1".to_string(), "a".to_string()]);
        t
    }

    #[test]
    fn test_round_trip_and_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path()).unwrap();

        assert!(cache.get::<DataTable>("abc").is_none());
        cache.set("abc", &sample_table()).unwrap();
        assert_eq!(cache.get::<DataTable>("abc"), Some(sample_table()));
        assert!(cache.get::<DataTable>("other").is_none());
    }

    #[test]
    fn test_empty_table_round_trips() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path()).unwrap();

        let empty = DataTable::empty(&["id", "value"]);
        cache.set("empty", &empty).unwrap();
        assert_eq!(cache.get::<DataTable>("empty"), Some(empty));
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path()).unwrap();

        fs::write(cache.dir().join("bad.json"), b"{ not json").unwrap();
        assert!(cache.get::<DataTable>("bad").is_none());
    }

    #[test]
    fn test_set_replaces_previous_entry() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path()).unwrap();

        cache.set("abc", &sample_table()).unwrap();
        let mut updated = sample_table();
        updated.rows.push(vec!["2".to_string(), "b".to_string()]);
        cache.set("abc", &updated).unwrap();
        assert_eq!(cache.get::<DataTable>("abc"), Some(updated));
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path()).unwrap();

        cache.set("a", &sample_table()).unwrap();
        cache.set("b", &sample_table()).unwrap();
        assert!(cache.remove("a").unwrap());
        assert!(!cache.remove("a").unwrap());
        assert_eq!(cache.clear().unwrap(), 1);
        assert_eq!(cache.stats().unwrap().entries, 0);
    }

    #[test]
    fn test_stats_counts_entries_and_bytes() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path()).unwrap();

        cache.set("a", &sample_table()).unwrap();
        cache.set("b", &sample_table()).unwrap();
        let stats = cache.stats().unwrap();
        assert_eq!(stats.entries, 2);
        assert!(stats.bytes > 0);
    }

    #[test]
    fn test_prune_keeps_fresh_entries() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path()).unwrap();

        cache.set("fresh", &sample_table()).unwrap();
        assert_eq!(cache.prune_older_than(1).unwrap(), 0);
        assert_eq!(cache.stats().unwrap().entries, 1);
    }
}
