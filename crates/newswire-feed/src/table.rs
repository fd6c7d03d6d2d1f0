//! Tables, per-file outcomes, and batch assembly
//!
//! Rows are loosely typed string cells under a fixed, feed-specific column
//! set. Row order across files is not guaranteed (each file is an
//! independent time shard); column order is fixed by the schema.

use serde::{Deserialize, Serialize};

/// A structured table with a fixed column set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    /// An empty table carrying only the column schema.
    pub fn empty(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Option<Vec<String>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).cloned().unwrap_or_default())
                .collect(),
        )
    }

    /// Append a column. `values` must have one entry per row; missing
    /// entries become empty cells.
    pub fn push_column(&mut self, name: &str, mut values: Vec<String>) {
        values.resize(self.rows.len(), String::new());
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }
}

/// Why an attempted file was excluded from the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Upstream has no file for this slot; benign
    NotFound,
    /// Transient failures exhausted the retry budget
    Fetch(String),
    /// The payload could not be decompressed or parsed
    Parse(String),
}

/// Outcome of one fetch-and-parse task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Table(DataTable),
    Skipped(SkipReason),
}

/// Per-batch outcome counts. Partial failure is reported here, never as an
/// error; callers distinguish "no data in range" from "total failure" by
/// comparing `attempted` against the failure counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub not_found: usize,
    pub failed: usize,
}

/// Result of assembling one batch of task outcomes.
#[derive(Debug)]
pub struct Assembly {
    pub table: DataTable,
    pub stats: BatchStats,
    /// Names of files with a terminal benign outcome (parsed or not-found),
    /// eligible for the incremental ledger
    pub completed: Vec<String>,
}

/// Concatenate the successful per-file tables under the fixed schema and
/// classify everything else into the stats. Concatenation is commutative
/// over input files, so completion order does not matter.
pub fn assemble(outcomes: Vec<(String, TaskOutcome)>, columns: &[&str]) -> Assembly {
    let mut table = DataTable::empty(columns);
    let mut stats = BatchStats {
        attempted: outcomes.len(),
        ..BatchStats::default()
    };
    let mut completed = Vec::new();

    for (name, outcome) in outcomes {
        match outcome {
            TaskOutcome::Table(t) => {
                stats.succeeded += 1;
                completed.push(name);
                table.rows.extend(t.rows);
            },
            TaskOutcome::Skipped(SkipReason::NotFound) => {
                stats.not_found += 1;
                completed.push(name);
            },
            TaskOutcome::Skipped(SkipReason::Fetch(_)) | TaskOutcome::Skipped(SkipReason::Parse(_)) => {
                stats.failed += 1;
            },
        }
    }

    Assembly {
        table,
        stats,
        completed,
    }
}
