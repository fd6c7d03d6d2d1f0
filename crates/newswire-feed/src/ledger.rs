//! Incremental fetch ledger
//!
//! Records, per query fingerprint, which files have already been fetched to
//! completion, so a re-run of the same query only touches the delta. Only
//! terminal outcomes are recorded (parsed files and files absent upstream);
//! transient failures stay unrecorded and are retried next run.

use crate::error::Result;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Aggregate size of the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub queries: usize,
    pub files: usize,
}

/// SQLite-backed record of completed files per query fingerprint.
pub struct FetchLedger {
    conn: Mutex<Connection>,
}

impl FetchLedger {
    /// Open (or create) a ledger database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Open the per-user default ledger database.
    pub fn open_default() -> Result<Self> {
        let base = dirs::cache_dir().ok_or_else(|| {
            crate::error::FeedError::config("could not determine the user cache directory")
        })?;
        Self::open(base.join("newswire").join("ledger.db"))
    }

    /// A private in-memory ledger, useful in tests and one-off runs.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS fetch_ledger (
                fingerprint TEXT PRIMARY KEY,
                files       TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Files already recorded for a fingerprint. A corrupt row is logged
    /// and treated as if nothing were recorded.
    pub fn recorded(&self, fingerprint: &str) -> Result<HashSet<String>> {
        let conn = self.conn();
        let row: Option<String> = conn
            .query_row(
                "SELECT files FROM fetch_ledger WHERE fingerprint = ?1",
                params![fingerprint],
                |row| row.get(0),
            )
            .optional()?;

        let Some(json) = row else {
            return Ok(HashSet::new());
        };
        match serde_json::from_str(&json) {
            Ok(files) => Ok(files),
            Err(e) => {
                warn!(fingerprint, error = %e, "Corrupt ledger row, treating as empty");
                Ok(HashSet::new())
            },
        }
    }

    /// Merge newly completed files into a fingerprint's record.
    pub fn record_fetched(&self, fingerprint: &str, files: &[String]) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }
        let mut recorded = self.recorded(fingerprint)?;
        recorded.extend(files.iter().cloned());

        let mut sorted: Vec<_> = recorded.into_iter().collect();
        sorted.sort();
        let json = serde_json::to_string(&sorted)?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO fetch_ledger (fingerprint, files, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(fingerprint) DO UPDATE SET
                 files = excluded.files,
                 updated_at = excluded.updated_at",
            params![fingerprint, json, Utc::now().to_rfc3339()],
        )?;
        debug!(fingerprint, added = files.len(), "Recorded completed files");
        Ok(())
    }

    /// Forget one fingerprint; returns whether a record existed.
    pub fn clear(&self, fingerprint: &str) -> Result<bool> {
        let conn = self.conn();
        let removed = conn.execute(
            "DELETE FROM fetch_ledger WHERE fingerprint = ?1",
            params![fingerprint],
        )?;
        Ok(removed > 0)
    }

    /// Forget everything; returns how many records were removed.
    pub fn clear_all(&self) -> Result<usize> {
        let conn = self.conn();
        let removed = conn.execute("DELETE FROM fetch_ledger", [])?;
        Ok(removed)
    }

    pub fn stats(&self) -> Result<LedgerStats> {
        let conn = self.conn();
        let queries: usize =
            conn.query_row("SELECT COUNT(*) FROM fetch_ledger", [], |row| row.get(0))?;

        let mut stmt = conn.prepare("SELECT files FROM fetch_ledger")?;
        let mut files = 0;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for json in rows {
            files += serde_json::from_str::<Vec<String>>(&json?)
                .map(|f| f.len())
                .unwrap_or(0);
        }
        Ok(LedgerStats { queries, files })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_recorded_grows_monotonically() {
        let ledger = FetchLedger::in_memory().unwrap();
        assert!(ledger.recorded("fp").unwrap().is_empty());

        ledger.record_fetched("fp", &names(&["a", "b"])).unwrap();
        ledger.record_fetched("fp", &names(&["b", "c"])).unwrap();

        let recorded = ledger.recorded("fp").unwrap();
        assert_eq!(recorded.len(), 3);
        assert!(recorded.contains("a"));
        assert!(recorded.contains("c"));
    }

    #[test]
    fn test_fingerprints_are_independent() {
        let ledger = FetchLedger::in_memory().unwrap();
        ledger.record_fetched("one", &names(&["a"])).unwrap();
        ledger.record_fetched("two", &names(&["b"])).unwrap();

        assert!(ledger.recorded("one").unwrap().contains("a"));
        assert!(!ledger.recorded("one").unwrap().contains("b"));
    }

    #[test]
    fn test_empty_record_is_a_no_op() {
        let ledger = FetchLedger::in_memory().unwrap();
        ledger.record_fetched("fp", &[]).unwrap();
        assert_eq!(ledger.stats().unwrap().queries, 0);
    }

    #[test]
    fn test_corrupt_row_is_treated_as_empty() {
        let ledger = FetchLedger::in_memory().unwrap();
        {
            let conn = ledger.conn();
            conn.execute(
                "INSERT INTO fetch_ledger (fingerprint, files, updated_at)
                 VALUES ('fp', 'not json', '2021-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        }

        assert!(ledger.recorded("fp").unwrap().is_empty());

        ledger.record_fetched("fp", &names(&["a"])).unwrap();
        let recorded = ledger.recorded("fp").unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(recorded.contains("a"));
    }

    #[test]
    fn test_clear_and_clear_all() {
        let ledger = FetchLedger::in_memory().unwrap();
        ledger.record_fetched("one", &names(&["a"])).unwrap();
        ledger.record_fetched("two", &names(&["b", "c"])).unwrap();

        assert!(ledger.clear("one").unwrap());
        assert!(!ledger.clear("one").unwrap());
        assert!(ledger.recorded("one").unwrap().is_empty());

        assert_eq!(ledger.clear_all().unwrap(), 1);
        assert_eq!(ledger.stats().unwrap(), LedgerStats::default());
    }

    #[test]
    fn test_stats() {
        let ledger = FetchLedger::in_memory().unwrap();
        ledger.record_fetched("one", &names(&["a"])).unwrap();
        ledger.record_fetched("two", &names(&["b", "c"])).unwrap();

        let stats = ledger.stats().unwrap();
        assert_eq!(stats.queries, 2);
        assert_eq!(stats.files, 3);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");

        let ledger = FetchLedger::open(&path).unwrap();
        ledger.record_fetched("fp", &names(&["a"])).unwrap();
        drop(ledger);

        let reopened = FetchLedger::open(&path).unwrap();
        assert!(reopened.recorded("fp").unwrap().contains("a"));
    }
}
