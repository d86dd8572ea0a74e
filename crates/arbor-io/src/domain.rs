//! Domain types for arbor-io.

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A table of categorical feature values with one class label per row.
///
/// Produced by [`CategoricalReader`](crate::CategoricalReader). Rows and
/// labels are parallel vectors: `labels[i]` is the class of `rows[i]`, and
/// `rows[i][j]` is the value of column `feature_names[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalDataset {
    feature_names: Vec<String>,
    target_name: String,
    rows: Vec<Vec<String>>,
    labels: Vec<String>,
}

impl CategoricalDataset {
    pub(crate) fn new(
        feature_names: Vec<String>,
        target_name: String,
        rows: Vec<Vec<String>>,
        labels: Vec<String>,
    ) -> Self {
        debug_assert_eq!(rows.len(), labels.len());
        Self {
            feature_names,
            target_name,
            rows,
            labels,
        }
    }

    /// Return the feature column names, in row order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the target column name.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Return the feature rows (row-major).
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Return the class labels.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Copy out the rows at `indices`, in the order given.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    #[must_use]
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
        }
    }
}
