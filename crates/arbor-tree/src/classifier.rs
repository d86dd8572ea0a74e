//! The fitted-model wrapper: tree plus global majority fallback.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::confusion::ConfusionMatrix;
use crate::error::TreeError;
use crate::export::ExportedNode;
use crate::node::Category;
use crate::stats::majority;
use crate::tree::{DecisionTree, build};

#[derive(Debug, Clone)]
struct Fitted<V, L> {
    tree: DecisionTree<V, L>,
    majority: L,
}

/// ID3 classifier over categorical feature rows.
///
/// Starts unfitted. [`fit`](Self::fit) builds the tree and records the
/// majority label of the whole training set; [`predict`](Self::predict)
/// walks the tree per row and falls back to that majority whenever a row
/// carries a value the tree never saw at some split.
///
/// ```
/// use arbor_tree::DecisionTreeClassifier;
///
/// let rows = vec![vec!["a", "x"], vec!["a", "y"], vec!["b", "x"], vec!["b", "x"]];
/// let labels = vec!["yes", "no", "no", "no"];
///
/// let mut model = DecisionTreeClassifier::new();
/// model.fit(&rows, &labels).unwrap();
///
/// let predictions = model.predict(&[vec!["a", "x"], vec!["c", "x"]]).unwrap();
/// assert_eq!(predictions, vec!["yes", "no"]);
/// ```
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier<V, L> {
    fitted: Option<Fitted<V, L>>,
}

impl<V: Category, L: Category> DecisionTreeClassifier<V, L> {
    /// Create an unfitted classifier.
    #[must_use]
    pub fn new() -> Self {
        Self { fitted: None }
    }

    /// Fit the classifier, replacing any previously fitted tree.
    ///
    /// `rows[sample_idx][column]`: row-major layout.
    /// `labels[sample_idx]`: one class per row.
    ///
    /// On error the classifier keeps whatever state it had before the call.
    ///
    /// # Errors
    ///
    /// | Variant                          | When                                         |
    /// |----------------------------------|----------------------------------------------|
    /// | [`TreeError::EmptyDataset`]      | no rows, zero-width rows, or `rows.len() != labels.len()` |
    /// | [`TreeError::InconsistentInput`] | rows have inconsistent widths                |
    #[instrument(skip_all, fields(n_samples = rows.len()))]
    pub fn fit<R: AsRef<[V]>>(&mut self, rows: &[R], labels: &[L]) -> Result<(), TreeError> {
        let n_features = rows.first().map_or(0, |r| r.as_ref().len());
        if rows.is_empty() || rows.len() != labels.len() || n_features == 0 {
            return Err(TreeError::EmptyDataset {
                n_rows: rows.len(),
                n_labels: labels.len(),
                n_features,
            });
        }

        for (row_index, row) in rows.iter().enumerate() {
            if row.as_ref().len() != n_features {
                return Err(TreeError::InconsistentInput {
                    expected: n_features,
                    got: row.as_ref().len(),
                    row_index,
                });
            }
        }

        let majority = majority(labels)?.clone();
        let columns: Vec<usize> = (0..n_features).collect();
        let tree = build(labels, rows, labels, &columns)?;

        info!(
            n_samples = rows.len(),
            n_features,
            n_nodes = tree.n_nodes(),
            n_leaves = tree.n_leaves(),
            depth = tree.depth(),
            "decision tree fitted"
        );

        self.fitted = Some(Fitted { tree, majority });
        Ok(())
    }

    /// Classify a single row.
    ///
    /// # Errors
    ///
    /// | Variant                          | When                                 |
    /// |----------------------------------|--------------------------------------|
    /// | [`TreeError::NotFitted`]         | called before a successful `fit`     |
    /// | [`TreeError::InconsistentInput`] | `row.len()` differs from the training width |
    pub fn predict_one(&self, row: &[V]) -> Result<L, TreeError> {
        let fitted = self.fitted.as_ref().ok_or(TreeError::NotFitted)?;
        check_width(fitted, row, 0)?;
        Ok(lookup(fitted, row))
    }

    /// Export a detached copy of the fitted tree structure.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFitted`] before a successful `fit`.
    pub fn export(&self) -> Result<ExportedNode<V, L>, TreeError> {
        let fitted = self.fitted.as_ref().ok_or(TreeError::NotFitted)?;
        Ok(fitted.tree.export())
    }

    /// Return `true` once `fit` has succeeded.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Return the majority label of the training set, if fitted.
    #[must_use]
    pub fn majority(&self) -> Option<&L> {
        self.fitted.as_ref().map(|f| &f.majority)
    }

    /// Borrow the fitted tree, if any.
    #[must_use]
    pub fn tree(&self) -> Option<&DecisionTree<V, L>> {
        self.fitted.as_ref().map(|f| &f.tree)
    }

    /// Return the row width the classifier was fitted on, if fitted.
    #[must_use]
    pub fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.tree.n_features())
    }
}

impl<V, L> DecisionTreeClassifier<V, L>
where
    V: Category + Sync,
    L: Category + Send + Sync,
{
    /// Predict a label for every row, in input order.
    ///
    /// Rows are routed independently and in parallel. An empty batch yields
    /// an empty result.
    ///
    /// # Errors
    ///
    /// | Variant                          | When                                 |
    /// |----------------------------------|--------------------------------------|
    /// | [`TreeError::NotFitted`]         | called before a successful `fit`     |
    /// | [`TreeError::InconsistentInput`] | any row's width differs from the training width |
    pub fn predict<R: AsRef<[V]> + Sync>(&self, rows: &[R]) -> Result<Vec<L>, TreeError> {
        let fitted = self.fitted.as_ref().ok_or(TreeError::NotFitted)?;
        // Widths are checked up front so the first bad row is the one reported.
        for (row_index, row) in rows.iter().enumerate() {
            check_width(fitted, row.as_ref(), row_index)?;
        }
        let predictions: Vec<L> = rows
            .par_iter()
            .map(|row| lookup(fitted, row.as_ref()))
            .collect();
        debug!(n_rows = predictions.len(), "batch predicted");
        Ok(predictions)
    }

    /// Predict `rows` and tabulate the predictions against `labels`.
    ///
    /// # Errors
    ///
    /// | Variant                           | When                                |
    /// |-----------------------------------|-------------------------------------|
    /// | [`TreeError::NotFitted`]          | called before a successful `fit`    |
    /// | [`TreeError::InconsistentInput`]  | any row's width differs from the training width |
    /// | [`TreeError::LabelCountMismatch`] | `rows.len() != labels.len()`        |
    /// | [`TreeError::EmptyDataset`]       | `rows` is empty                     |
    pub fn evaluate<R: AsRef<[V]> + Sync>(
        &self,
        rows: &[R],
        labels: &[L],
    ) -> Result<ConfusionMatrix<L>, TreeError> {
        let predicted = self.predict(rows)?;
        ConfusionMatrix::from_labels(labels, &predicted)
    }
}

impl<V: Category, L: Category> Default for DecisionTreeClassifier<V, L> {
    fn default() -> Self {
        Self::new()
    }
}

fn check_width<V, L>(fitted: &Fitted<V, L>, row: &[V], row_index: usize) -> Result<(), TreeError> {
    let n_features = fitted.tree.n_features;
    if row.len() != n_features {
        return Err(TreeError::InconsistentInput {
            expected: n_features,
            got: row.len(),
            row_index,
        });
    }
    Ok(())
}

/// Route a row of the training width, falling back to the global majority.
fn lookup<V: Category, L: Category>(fitted: &Fitted<V, L>, row: &[V]) -> L {
    fitted
        .tree
        .traverse(row)
        .unwrap_or(&fitted.majority)
        .clone()
}
