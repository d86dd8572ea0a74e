//! JSON result writer for fitted trees, evaluations, and predictions.

use std::fs;
use std::path::{Path, PathBuf};

use arbor_tree::{Category, ConfusionMatrix, ExportedNode};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes classification artifacts to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_tree.json`,
/// `{experiment}_evaluate.json`, and `{experiment}_predict.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write a fitted tree to `{experiment}_tree.json` and return its path.
    ///
    /// The artifact carries the exported node structure together with the
    /// feature names its column indices refer to and the training majority
    /// used for unseen values.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | A value cannot be encoded as JSON |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all)]
    pub fn write_tree<V: Serialize, L: Serialize>(
        &self,
        tree: &ExportedNode<V, L>,
        feature_names: &[String],
        target_name: &str,
        majority: &L,
        n_training: usize,
    ) -> Result<PathBuf, IoError> {
        let artifact = TreeArtifact {
            experiment: self.experiment.as_str(),
            target: target_name,
            feature_names,
            n_training,
            majority,
            n_leaves: tree.n_leaves(),
            depth: tree.depth(),
            tree,
        };
        let path = self.write_json("tree", &artifact)?;
        info!(path = %path.display(), "tree written");
        Ok(path)
    }

    /// Write a validation confusion matrix to `{experiment}_evaluate.json`
    /// and return its path.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | A label cannot be encoded as JSON |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all)]
    pub fn write_evaluation<L: Category + Serialize>(
        &self,
        confusion: &ConfusionMatrix<L>,
    ) -> Result<PathBuf, IoError> {
        let metrics = confusion.class_metrics();
        let class_metrics: Vec<ClassEntry<'_, L>> = metrics
            .iter()
            .map(|m| ClassEntry {
                class: &m.class,
                precision: m.precision,
                recall: m.recall,
                f1: m.f1,
                support: m.support,
            })
            .collect();

        let artifact = EvaluateArtifact {
            experiment: self.experiment.as_str(),
            n_samples: confusion.as_rows().iter().flatten().sum(),
            accuracy: confusion.accuracy(),
            classes: confusion.classes(),
            confusion_matrix: confusion.as_rows(),
            class_metrics,
        };
        let path = self.write_json("evaluate", &artifact)?;
        info!(path = %path.display(), "evaluation result written");
        Ok(path)
    }

    /// Write one predicted label per input row to `{experiment}_predict.json`
    /// and return its path.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | A label cannot be encoded as JSON |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all)]
    pub fn write_predictions<L: Serialize>(&self, predictions: &[L]) -> Result<PathBuf, IoError> {
        let entries: Vec<PredictionEntry<'_, L>> = predictions
            .iter()
            .enumerate()
            .map(|(row, predicted)| PredictionEntry { row, predicted })
            .collect();

        let artifact = PredictArtifact {
            experiment: self.experiment.as_str(),
            n_rows: predictions.len(),
            predictions: entries,
        };
        let path = self.write_json("predict", &artifact)?;
        info!(path = %path.display(), n_rows = predictions.len(), "predictions written");
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, suffix: &str, artifact: &T) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_{suffix}.json", self.experiment.as_str()));
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct TreeArtifact<'a, V, L> {
    experiment: &'a str,
    target: &'a str,
    feature_names: &'a [String],
    n_training: usize,
    majority: &'a L,
    n_leaves: usize,
    depth: usize,
    tree: &'a ExportedNode<V, L>,
}

#[derive(Serialize)]
struct EvaluateArtifact<'a, L> {
    experiment: &'a str,
    n_samples: usize,
    accuracy: f64,
    classes: &'a [L],
    confusion_matrix: &'a [Vec<usize>],
    class_metrics: Vec<ClassEntry<'a, L>>,
}

#[derive(Serialize)]
struct ClassEntry<'a, L> {
    class: &'a L,
    precision: f64,
    recall: f64,
    f1: f64,
    support: usize,
}

#[derive(Serialize)]
struct PredictArtifact<'a, L> {
    experiment: &'a str,
    n_rows: usize,
    predictions: Vec<PredictionEntry<'a, L>>,
}

#[derive(Serialize)]
struct PredictionEntry<'a, L> {
    row: usize,
    predicted: &'a L,
}
