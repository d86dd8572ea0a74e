//! Confusion matrix and per-class classification metrics.

use std::collections::HashMap;
use std::fmt;

use crate::error::TreeError;
use crate::node::Category;

/// A confusion matrix for multi-class classification over arbitrary labels.
///
/// Classes are indexed in first-seen order, scanning the true labels and
/// then the predictions. Entry `matrix[t][p]` counts how many rows with
/// true class `classes[t]` were predicted as `classes[p]`.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix<L> {
    classes: Vec<L>,
    matrix: Vec<Vec<usize>>,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone)]
pub struct ClassMetrics<L> {
    /// The class label.
    pub class: L,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true samples for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl<L: Category> ConfusionMatrix<L> {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::EmptyDataset`] | Zero labels provided |
    /// | [`TreeError::LabelCountMismatch`] | `true_labels.len() != predicted.len()` |
    pub fn from_labels(true_labels: &[L], predicted: &[L]) -> Result<Self, TreeError> {
        if true_labels.len() != predicted.len() {
            return Err(TreeError::LabelCountMismatch {
                n_true: true_labels.len(),
                n_predicted: predicted.len(),
            });
        }
        if true_labels.is_empty() {
            return Err(TreeError::EmptyDataset {
                n_rows: 0,
                n_labels: 0,
                n_features: 0,
            });
        }

        let mut index: HashMap<&L, usize> = HashMap::new();
        let mut classes: Vec<L> = Vec::new();
        for label in true_labels.iter().chain(predicted) {
            if !index.contains_key(label) {
                index.insert(label, classes.len());
                classes.push(label.clone());
            }
        }

        let n_classes = classes.len();
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (t, p) in true_labels.iter().zip(predicted) {
            matrix[index[t]][index[p]] += 1;
        }
        Ok(Self { classes, matrix })
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes()).map(|i| self.matrix[i][i]).sum();
        let total: usize = self.matrix.iter().flat_map(|row| row.iter()).sum();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Per-class precision, recall, F1, and support, in class order.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics<L>> {
        let n = self.n_classes();
        (0..n)
            .map(|c| {
                let tp = self.matrix[c][c];
                let fp: usize = (0..n).filter(|&i| i != c).map(|i| self.matrix[i][c]).sum();
                let fn_: usize = (0..n).filter(|&j| j != c).map(|j| self.matrix[c][j]).sum();
                let support = tp + fn_;
                let precision = if tp + fp == 0 {
                    0.0
                } else {
                    tp as f64 / (tp + fp) as f64
                };
                let recall = if support == 0 {
                    0.0
                } else {
                    tp as f64 / support as f64
                };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: self.classes[c].clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the class labels in matrix order.
    #[must_use]
    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

impl<L: fmt::Display> fmt::Display for ConfusionMatrix<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.classes.iter().map(ToString::to_string).collect();
        let width = names.iter().map(String::len).max().unwrap_or(0).max(5);

        write!(f, "{:>width$}", "true\\pred")?;
        for name in &names {
            write!(f, " {name:>width$}")?;
        }
        writeln!(f)?;

        for (name, row) in names.iter().zip(&self.matrix) {
            write!(f, "{name:>width$}", width = width.max(9))?;
            for val in row {
                write!(f, " {val:>width$}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
