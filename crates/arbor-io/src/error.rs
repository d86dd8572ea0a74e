//! I/O error types for arbor-io.

use std::path::PathBuf;

/// Errors from file I/O, CSV parsing, dataset splitting, and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a requested target or feature column is not in the header.
    #[error("column \"{name}\" not found in header of {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The requested column name.
        name: String,
    },

    /// Returned when no feature columns remain after removing the target.
    #[error("no feature columns in {path}")]
    NoFeatureColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a column name appears twice in the header or the
    /// feature selection, or a feature is also the target.
    #[error("column \"{name}\" selected or declared more than once in {path}")]
    DuplicateColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The duplicated column name.
        name: String,
    },

    /// Returned when no target column was configured on the reader.
    #[error("no target column configured for {path}")]
    MissingTarget {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when the validation fraction is outside `[0, 1)`.
    #[error("invalid validation fraction {fraction}: must be in [0, 1)")]
    InvalidValidationFraction {
        /// The rejected fraction.
        fraction: f64,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result artifact cannot be encoded as JSON.
    #[error("cannot serialize result for {path}")]
    Serialize {
        /// Destination path of the artifact.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
