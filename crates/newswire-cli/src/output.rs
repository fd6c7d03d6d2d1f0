//! Table output
//!
//! Writes an assembled table as CSV (with a header row) or JSON (an array
//! of objects) to a file or stdout.

use crate::error::{CliError, Result};
use newswire_feed::table::DataTable;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(CliError::invalid_argument(format!(
                "unknown output format '{}'; expected 'csv' or 'json'",
                other
            ))),
        }
    }
}

/// Write a table to `output`, or stdout when no path is given.
pub fn write_table(table: &DataTable, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            write_to(table, format, File::create(path)?)
        },
        None => write_to(table, format, io::stdout().lock()),
    }
}

fn write_to<W: Write>(table: &DataTable, format: OutputFormat, writer: W) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(table, writer),
        OutputFormat::Json => write_json(table, writer),
    }
}

fn write_csv<W: Write>(table: &DataTable, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&table.columns)?;
    for row in &table.rows {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn write_json<W: Write>(table: &DataTable, mut writer: W) -> Result<()> {
    let objects: Vec<Value> = table
        .rows
        .iter()
        .map(|row| {
            let map: Map<String, Value> = table
                .columns
                .iter()
                .zip(row)
                .map(|(col, cell)| (col.clone(), Value::String(cell.clone())))
                .collect();
            Value::Object(map)
        })
        .collect();
    serde_json::to_writer_pretty(&mut writer, &objects)?;
    writeln!(writer)?;
    Ok(())
}
