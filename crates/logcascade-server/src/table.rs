//! CSV tables of log records

use logcascade_classifiers::Cascade;
use logcascade_core::{Label, LogRecord};
use std::io::Read;
use std::path::Path;

/// Column holding the emitting system
pub const SOURCE_COLUMN: &str = "source";

/// Column holding the raw message
pub const MESSAGE_COLUMN: &str = "log_message";

/// Column appended with the assigned label
pub const LABEL_COLUMN: &str = "target_label";

/// Column appended with the deciding strategy
pub const DECIDED_BY_COLUMN: &str = "decided_by";

/// Table errors
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("CSV must contain 'source' and 'log_message' columns.")]
    MissingColumns,

    #[error("Failed to parse CSV: {0}")]
    Parse(#[from] csv::Error),

    #[error("Column '{column}' has {actual} values for {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to write CSV: {0}")]
    Write(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// An uploaded table; columns other than source and message pass through untouched
#[derive(Debug, Clone)]
pub struct LogTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    source_idx: usize,
    message_idx: usize,
}

impl LogTable {
    /// Parse a table with a header row
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let position = |name: &str| headers.iter().position(|h| h == name);
        let (Some(source_idx), Some(message_idx)) =
            (position(SOURCE_COLUMN), position(MESSAGE_COLUMN))
        else {
            return Err(TableError::MissingColumns);
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        Ok(Self {
            headers,
            rows,
            source_idx,
            message_idx,
        })
    }

    /// Parse a table from memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        Self::from_reader(bytes)
    }

    /// Parse a table from a file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Column names, in order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Log records in row order
    pub fn records(&self) -> Vec<LogRecord> {
        self.rows
            .iter()
            .map(|row| LogRecord::new(&row[self.source_idx], &row[self.message_idx]))
            .collect()
    }

    /// Values of a column, if present
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.headers.iter().position(|h| h == name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Append a column, or overwrite it if it already exists
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.rows.len(),
                actual: values.len(),
            });
        }

        match self.headers.iter().position(|h| h == name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }

        Ok(())
    }

    /// Serialize with the header row
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, TableError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| TableError::Write(e.to_string()))
    }

    /// Write to a file, replacing it
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), TableError> {
        std::fs::write(path, self.to_csv_bytes()?)?;
        Ok(())
    }
}

/// Classify every row and append the label column.
///
/// With `explain`, a second column names the strategy whose answer was kept
/// (empty when no strategy answered).
pub async fn classify_table(
    cascade: &Cascade,
    table: &mut LogTable,
    explain: bool,
) -> Result<(), TableError> {
    let records = table.records();

    if explain {
        let decisions = cascade.classify_detailed(&records).await;
        let mut labels = Vec::with_capacity(decisions.len());
        let mut decided_by = Vec::with_capacity(decisions.len());
        for decision in decisions {
            labels.push(decision.label.into_string());
            decided_by.push(decision.decided_by.unwrap_or_default());
        }
        table.set_column(LABEL_COLUMN, labels)?;
        table.set_column(DECIDED_BY_COLUMN, decided_by)?;
    } else {
        let labels = cascade.classify(&records).await;
        table.set_column(LABEL_COLUMN, labels.into_iter().map(Label::into_string).collect())?;
    }

    Ok(())
}
