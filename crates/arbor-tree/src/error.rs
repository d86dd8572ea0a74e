//! Error type for the tree crate.

/// Errors from tree induction, classification, and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Returned when a majority label is requested from an empty label set.
    ///
    /// `fit` and `predict` never let this escape; seeing it means the
    /// builder was called with an empty root label set.
    #[error("cannot take the majority of an empty label set")]
    EmptyInput,

    /// Returned when the training dataset has no rows, no columns, or a
    /// row count that differs from the label count.
    #[error("training dataset is empty or unpaired: {n_rows} rows, {n_labels} labels, {n_features} columns")]
    EmptyDataset {
        /// Number of feature rows provided.
        n_rows: usize,
        /// Number of labels provided.
        n_labels: usize,
        /// Width of the first row (0 when there are no rows).
        n_features: usize,
    },

    /// Returned when the builder receives rows and labels of different length.
    #[error("builder received {n_rows} rows but {n_labels} labels")]
    RowLabelMismatch {
        /// Number of feature rows.
        n_rows: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a row's width does not match the expected column domain.
    #[error("row {row_index} has {got} columns, expected {expected}")]
    InconsistentInput {
        /// The expected row width.
        expected: usize,
        /// The actual width of the offending row.
        got: usize,
        /// The zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when a candidate column lies outside every row's width.
    #[error("column {column} is out of range for rows of width {n_features}")]
    ColumnOutOfRange {
        /// The offending column index.
        column: usize,
        /// The row width.
        n_features: usize,
    },

    /// Returned when `predict` or `export` is called before a successful `fit`.
    #[error("classifier has not been fitted")]
    NotFitted,

    /// Returned when true and predicted label sequences differ in length.
    #[error("got {n_true} true labels but {n_predicted} predictions")]
    LabelCountMismatch {
        /// Number of ground-truth labels.
        n_true: usize,
        /// Number of predicted labels.
        n_predicted: usize,
    },
}
