//! Payload decoding
//!
//! Turns the raw bytes of one remote file into a [`DataTable`] under the
//! feed's fixed column set: decompress (zip or gzip), decode text (UTF-8
//! with a Latin-1 fallback, which upstream archives occasionally need),
//! then parse either headerless TSV or line-delimited JSON.

use crate::error::{FeedError, Result};
use crate::schema::{Compression, FeedSchema, PayloadFormat};
use crate::table::DataTable;
use flate2::read::GzDecoder;
use std::io::{Cursor, Read};
use tracing::debug;

/// Decode one fetched payload into a table with the schema's columns.
pub fn parse(bytes: &[u8], schema: &FeedSchema, raw: bool) -> Result<DataTable> {
    let decompressed = decompress(bytes, schema.compression)?;
    let text = decode_text(decompressed);
    let columns = schema.columns_for(raw);

    match schema.format {
        PayloadFormat::Tsv => parse_tsv(&text, columns),
        PayloadFormat::JsonLines => parse_json_lines(&text, columns),
    }
}

fn decompress(bytes: &[u8], compression: Compression) -> Result<Vec<u8>> {
    match compression {
        Compression::Zip => {
            let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
                .map_err(|e| FeedError::parse(format!("invalid zip archive: {}", e)))?;
            if archive.len() == 0 {
                return Err(FeedError::parse("zip archive contains no entries"));
            }
            // Upstream archives hold exactly one data file.
            let mut entry = archive
                .by_index(0)
                .map_err(|e| FeedError::parse(format!("unreadable zip entry: {}", e)))?;
            let mut out = Vec::new();
            entry
                .read_to_end(&mut out)
                .map_err(|e| FeedError::parse(format!("truncated zip entry: {}", e)))?;
            Ok(out)
        },
        Compression::Gzip => {
            let mut decoder = GzDecoder::new(bytes);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| FeedError::parse(format!("invalid gzip stream: {}", e)))?;
            Ok(out)
        },
    }
}

/// UTF-8 first; on failure re-decode as Latin-1, which maps every byte to
/// the code point of the same value and therefore cannot fail.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            debug!("Payload is not valid UTF-8, falling back to Latin-1");
            e.into_bytes().iter().map(|&b| b as char).collect()
        },
    }
}

/// Headerless tab-separated rows. Records are padded or truncated to the
/// column width; records the reader cannot split are dropped.
fn parse_tsv(text: &str, columns: &[&str]) -> Result<DataTable> {
    let mut table = DataTable::empty(columns);
    let width = columns.len();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    for record in reader.records() {
        match record {
            Ok(record) => {
                let mut row: Vec<String> = record.iter().map(|cell| cell.to_string()).collect();
                row.resize(width, String::new());
                table.rows.push(row);
            },
            Err(e) => {
                debug!(error = %e, "Dropping malformed record");
            },
        }
    }

    Ok(table)
}

/// One JSON object per line. Values are flattened to cells: strings keep
/// their content, nulls and missing keys become empty cells, and composite
/// values are kept as compact JSON text.
fn parse_json_lines(text: &str, columns: &[&str]) -> Result<DataTable> {
    let mut table = DataTable::empty(columns);

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Dropping malformed record");
                continue;
            },
        };
        let Some(object) = value.as_object() else {
            debug!("Dropping non-object record");
            continue;
        };

        let row = columns
            .iter()
            .map(|col| match object.get(*col) {
                None | Some(serde_json::Value::Null) => String::new(),
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect();
        table.rows.push(row);
    }

    Ok(table)
}
