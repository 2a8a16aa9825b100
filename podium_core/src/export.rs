//! CSV export of session history for spreadsheets and charting tools.

use crate::{Error, Result, SessionSummary};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the CSV file
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    timestamp: String,
    correct_percentage: f64,
    correct_seconds: f64,
    incorrect_seconds: f64,
    total_seconds: f64,
}

impl From<&SessionSummary> for CsvRow {
    fn from(summary: &SessionSummary) -> Self {
        CsvRow {
            timestamp: summary.timestamp.to_rfc3339(),
            correct_percentage: summary.correct_percentage,
            correct_seconds: summary.correct_seconds,
            incorrect_seconds: summary.incorrect_seconds,
            total_seconds: summary.total_seconds,
        }
    }
}

impl TryFrom<CsvRow> for SessionSummary {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| Error::Store(format!("Invalid timestamp {:?}: {}", row.timestamp, e)))?
            .with_timezone(&Utc);

        Ok(SessionSummary {
            timestamp,
            correct_percentage: row.correct_percentage,
            correct_seconds: row.correct_seconds,
            incorrect_seconds: row.incorrect_seconds,
            total_seconds: row.total_seconds,
        })
    }
}

/// Write the full history to `path`, replacing any previous export
///
/// The file is written to a temp file, synced, then renamed into place.
/// Returns the number of rows written.
pub fn write_history_csv(history: &[SessionSummary], path: &Path) -> Result<usize> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(temp.as_file());
        for summary in history {
            writer.serialize(CsvRow::from(summary))?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported {} sessions to {:?}", history.len(), path);
    Ok(history.len())
}

/// Read an exported history back, oldest first
///
/// Malformed rows are skipped with a warning.
pub fn read_history_csv(path: &Path) -> Result<Vec<SessionSummary>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut history = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match SessionSummary::try_from(row) {
                Ok(summary) => history.push(summary),
                Err(e) => tracing::warn!("Failed to parse CSV row: {}", e),
            },
            Err(e) => tracing::warn!("Failed to deserialize CSV row: {}", e),
        }
    }

    Ok(history)
}
