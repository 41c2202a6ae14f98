use std::fmt;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::Serialize;

/// Padding value for cells a ragged row did not provide.
pub const MISSING: f64 = f64::NAN;

// ---------------------------------------------------------------------------
// Diagnostic – row-level problems that do not abort extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A data row had a different number of fields than the dataset's
    /// most common width. The row was kept, padded with `MISSING` or
    /// truncated to fit.
    InconsistentRowWidth {
        /// Row index within the data matrix.
        row: usize,
        /// 0-based line number in the source file.
        line: usize,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InconsistentRowWidth {
                row,
                line,
                expected,
                found,
            } => write!(
                f,
                "row {row} (line {}) has {found} fields, expected {expected}",
                line + 1
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – one extracted log
// ---------------------------------------------------------------------------

/// One dataset pulled out of a log file: the numeric matrix plus everything
/// around it that was not data.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    /// Position of this dataset within its file.
    pub source_index: usize,
    /// Non-data lines in file order, newline-joined.
    pub notes: String,
    /// Column names, when a label row sat directly above the first data row.
    pub labels: Option<Vec<String>>,
    /// Row-major, rectangular. Missing cells hold [`MISSING`].
    pub data: Vec<Vec<f64>>,
    /// Rows that needed padding.
    pub diagnostics: Vec<Diagnostic>,
    /// Delimiter the rows were split with.
    pub delimiter: String,
    /// First `YYYY/MM/DD`-style date seen in the marker line or notes.
    pub date: Option<String>,
    /// First `HH:MM:SS` time seen in the marker line or notes.
    pub start_time: Option<String>,
}

impl Dataset {
    /// Number of data rows.
    pub fn n_rows(&self) -> usize {
        self.data.len()
    }

    /// Number of columns (0 for a dataset with no data).
    pub fn n_cols(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy out column `idx`.
    pub fn column(&self, idx: usize) -> Option<Vec<f64>> {
        if idx >= self.n_cols() {
            return None;
        }
        Some(self.data.iter().map(|row| row[idx]).collect())
    }

    /// Position of the column called `name`.
    ///
    /// Matches a label exactly first, then by its leading identifier so that
    /// `time` finds `time [s]` or `time(s)`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let labels = self.labels.as_ref()?;
        let name = name.trim();
        labels
            .iter()
            .position(|l| l == name)
            .or_else(|| labels.iter().position(|l| label_stem(l) == name))
    }

    /// Copy out the column called `name`; see [`Dataset::column_index`].
    pub fn column_by_name(&self, name: &str) -> Option<Vec<f64>> {
        self.column_index(name).and_then(|i| self.column(i))
    }

    /// Column names for display: labels where known, `col_N` otherwise.
    pub fn column_names(&self) -> Vec<String> {
        (0..self.n_cols())
            .map(|i| {
                self.labels
                    .as_ref()
                    .and_then(|l| l.get(i))
                    .cloned()
                    .unwrap_or_else(|| format!("col_{i}"))
            })
            .collect()
    }

    /// Columnar view of the data matrix. Missing cells become Arrow nulls.
    pub fn to_record_batch(&self) -> crate::Result<RecordBatch> {
        let names = self.column_names();
        let fields: Vec<Field> = names
            .iter()
            .map(|n| Field::new(n, DataType::Float64, true))
            .collect();
        let columns: Vec<ArrayRef> = (0..self.n_cols())
            .map(|i| {
                let values: Float64Array = self
                    .data
                    .iter()
                    .map(|row| Some(row[i]).filter(|v| !v.is_nan()))
                    .collect();
                Arc::new(values) as ArrayRef
            })
            .collect();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(batch)
    }
}

/// Leading identifier of a label: `"Pressure [kPa]"` → `"Pressure"`.
fn label_stem(label: &str) -> &str {
    label
        .split(['[', '('])
        .next()
        .unwrap_or(label)
        .trim()
}
