//! Run summary types and CSV serialisation.
//!
//! The CSV is written exactly once, after every document has been processed:
//! the header is the lexicographically sorted union of all row keys, so the
//! full row set must be known before the first byte is written. The write is
//! atomic (temp file + rename) so a crash mid-write never leaves a partial
//! export behind.

use crate::error::{DocumentError, ExtractError};
use crate::pipeline::flatten::Row;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Statistics and per-document failures for one extraction run.
///
/// Returned by [`crate::process::process_invoices`] on success — success
/// meaning "at least one row was written", even if some documents failed
/// (check [`RunSummary::failures`]).
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// PDF files found in the input directory.
    pub documents_total: usize,
    /// Documents that contributed at least one row.
    pub documents_extracted: usize,
    /// Documents that failed at some pipeline stage.
    pub documents_failed: usize,
    /// Rows written to the CSV.
    pub rows_written: usize,
    /// Final header: sorted union of all row keys.
    pub columns: Vec<String>,
    /// Wall-clock duration of the whole run.
    pub total_duration_ms: u64,
    /// Time spent rasterising pages.
    pub render_duration_ms: u64,
    /// Time spent waiting on the model.
    pub llm_duration_ms: u64,
    /// Every per-document error encountered, in processing order.
    pub failures: Vec<DocumentError>,
}

/// Render one cell for CSV output.
///
/// Strings are written verbatim (the `csv` crate handles quoting), null
/// becomes an empty field, and any other JSON value falls back to its
/// compact serialisation.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write all accumulated rows as UTF-8, comma-delimited text.
///
/// `columns` is the pre-sorted union header; a row missing a column renders
/// that field empty. Writes to `<path>.tmp` and renames into place.
pub fn write_rows(path: &Path, columns: &[String], rows: &[Row]) -> Result<(), ExtractError> {
    let write_failed = |detail: String| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        detail,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
        }
    }

    let tmp_path = path.with_extension("csv.tmp");
    let mut writer = csv::Writer::from_path(&tmp_path).map_err(|e| write_failed(e.to_string()))?;

    writer
        .write_record(columns)
        .map_err(|e| write_failed(e.to_string()))?;

    for row in rows {
        let record = columns
            .iter()
            .map(|column| row.get(column).map(cell_text).unwrap_or_default());
        writer
            .write_record(record)
            .map_err(|e| write_failed(e.to_string()))?;
    }

    writer.flush().map_err(|e| write_failed(e.to_string()))?;
    drop(writer);

    std::fs::rename(&tmp_path, path).map_err(|e| write_failed(e.to_string()))
}
