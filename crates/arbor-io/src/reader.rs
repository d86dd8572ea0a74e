//! CSV reader for categorical classification tables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::CategoricalDataset;

/// Reads a categorical table from a headered CSV file.
///
/// One column is the class label (the *target*); the feature columns are
/// either selected by name or, by default, every other column in header
/// order. Cells are read as strings with surrounding whitespace trimmed and
/// are compared only by equality downstream.
///
/// ```no_run
/// use std::path::Path;
/// use arbor_io::CategoricalReader;
///
/// let dataset = CategoricalReader::new(Path::new("testdata.csv"))
///     .with_target("cls3")
///     .with_features(["cat1", "cat2"])
///     .read()
///     .unwrap();
/// assert_eq!(dataset.n_features(), 2);
/// ```
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingTarget`] | No target column configured |
/// | [`IoError::MissingColumn`] | Target or a selected feature is not in the header |
/// | [`IoError::DuplicateColumn`] | Header repeats a name, or a column is selected twice |
/// | [`IoError::NoFeatureColumns`] | Nothing left to use as a feature |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
#[derive(Debug, Clone)]
pub struct CategoricalReader {
    path: PathBuf,
    target: Option<String>,
    features: Option<Vec<String>>,
}

impl CategoricalReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            target: None,
            features: None,
        }
    }

    /// Set the class label column.
    #[must_use]
    pub fn with_target(mut self, name: impl Into<String>) -> Self {
        self.target = Some(name.into());
        self
    }

    /// Restrict the feature columns to `names`, in the given order.
    #[must_use]
    pub fn with_features<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Return the CSV path this reader targets.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the CSV file, returning a [`CategoricalDataset`].
    ///
    /// Requires a target column.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<CategoricalDataset, IoError> {
        let target_name = self.target.as_deref().ok_or_else(|| IoError::MissingTarget {
            path: self.path.clone(),
        })?;
        let table = self.load(Some(target_name))?;

        info!(
            n_samples = table.rows.len(),
            n_features = table.feature_names.len(),
            target = target_name,
            "categorical dataset loaded"
        );

        Ok(CategoricalDataset::new(
            table.feature_names,
            target_name.to_string(),
            table.rows,
            table.labels,
        ))
    }

    /// Read only the feature values, for rows whose class is unknown.
    ///
    /// Selection works as in [`read`](Self::read), except that the target
    /// column is optional: when configured and present in the header it is
    /// excluded from the default feature set, and its cells are ignored.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read_unlabeled(&self) -> Result<Vec<Vec<String>>, IoError> {
        let table = self.load(None)?;
        info!(
            n_samples = table.rows.len(),
            n_features = table.feature_names.len(),
            "unlabeled rows loaded"
        );
        Ok(table.rows)
    }

    fn load(&self, required_target: Option<&str>) -> Result<Table, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that short or long rows surface as
        // InconsistentRowLength rather than a generic CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(expected_cols);
        for (i, name) in header.iter().enumerate() {
            if positions.insert(name, i).is_some() {
                return Err(IoError::DuplicateColumn {
                    path: self.path.clone(),
                    name: name.to_string(),
                });
            }
        }

        let target_col = match required_target {
            Some(name) => Some(self.column(&positions, name)?),
            None => self
                .target
                .as_deref()
                .and_then(|name| positions.get(name).copied()),
        };

        let feature_cols: Vec<usize> = match &self.features {
            Some(names) => {
                let mut cols = Vec::with_capacity(names.len());
                for name in names {
                    let col = self.column(&positions, name)?;
                    if Some(col) == target_col || cols.contains(&col) {
                        return Err(IoError::DuplicateColumn {
                            path: self.path.clone(),
                            name: name.clone(),
                        });
                    }
                    cols.push(col);
                }
                cols
            }
            None => (0..expected_cols).filter(|&c| Some(c) != target_col).collect(),
        };
        if feature_cols.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        let feature_names: Vec<String> = feature_cols.iter().map(|&c| header[c].to_string()).collect();

        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut labels: Vec<String> = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }
            rows.push(feature_cols.iter().map(|&c| record[c].to_string()).collect());
            if let Some(col) = target_col.filter(|_| required_target.is_some()) {
                labels.push(record[col].to_string());
            }
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        Ok(Table {
            feature_names,
            rows,
            labels,
        })
    }

    fn column(&self, positions: &HashMap<&str, usize>, name: &str) -> Result<usize, IoError> {
        positions.get(name).copied().ok_or_else(|| IoError::MissingColumn {
            path: self.path.clone(),
            name: name.to_string(),
        })
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

struct Table {
    feature_names: Vec<String>,
    rows: Vec<Vec<String>>,
    /// Empty unless a target was required.
    labels: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    const WEATHER: &str = "outlook,wind,play\nsunny,weak,no\novercast,strong,yes\nrain,weak,yes\n";

    #[test]
    fn read_all_non_target_columns_by_default() {
        let f = write_csv(WEATHER);
        let ds = CategoricalReader::new(f.path()).with_target("play").read().unwrap();
        assert_eq!(ds.n_samples(), 3);
        assert_eq!(ds.feature_names(), &["outlook", "wind"]);
        assert_eq!(ds.target_name(), "play");
        assert_eq!(ds.rows()[1], vec!["overcast", "strong"]);
        assert_eq!(ds.labels(), &["no", "yes", "yes"]);
    }

    #[test]
    fn target_need_not_be_last() {
        let f = write_csv("play,outlook\nno,sunny\nyes,rain\n");
        let ds = CategoricalReader::new(f.path()).with_target("play").read().unwrap();
        assert_eq!(ds.feature_names(), &["outlook"]);
        assert_eq!(ds.rows()[0], vec!["sunny"]);
        assert_eq!(ds.labels(), &["no", "yes"]);
    }

    #[test]
    fn selected_features_follow_given_order() {
        let f = write_csv(WEATHER);
        let ds = CategoricalReader::new(f.path())
            .with_target("play")
            .with_features(["wind", "outlook"])
            .read()
            .unwrap();
        assert_eq!(ds.feature_names(), &["wind", "outlook"]);
        assert_eq!(ds.rows()[0], vec!["weak", "sunny"]);
    }

    #[test]
    fn cells_are_trimmed() {
        let f = write_csv("a , b\n x , yes \n");
        let ds = CategoricalReader::new(f.path()).with_target("b").read().unwrap();
        assert_eq!(ds.feature_names(), &["a"]);
        assert_eq!(ds.rows()[0], vec!["x"]);
        assert_eq!(ds.labels(), &["yes"]);
    }

    #[test]
    fn file_not_found_error() {
        let err = CategoricalReader::new(Path::new("/nonexistent/arbor.csv"))
            .with_target("play")
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }

    #[test]
    fn missing_target_error() {
        let f = write_csv(WEATHER);
        let err = CategoricalReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::MissingTarget { .. }));
    }

    #[test]
    fn unknown_target_column_error() {
        let f = write_csv(WEATHER);
        let err = CategoricalReader::new(f.path()).with_target("class").read().unwrap_err();
        assert!(matches!(err, IoError::MissingColumn { ref name, .. } if name == "class"));
    }

    #[test]
    fn unknown_feature_column_error() {
        let f = write_csv(WEATHER);
        let err = CategoricalReader::new(f.path())
            .with_target("play")
            .with_features(["outlook", "humidity"])
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::MissingColumn { ref name, .. } if name == "humidity"));
    }

    #[test]
    fn target_selected_as_feature_error() {
        let f = write_csv(WEATHER);
        let err = CategoricalReader::new(f.path())
            .with_target("play")
            .with_features(["outlook", "play"])
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::DuplicateColumn { .. }));
    }

    #[test]
    fn duplicate_header_error() {
        let f = write_csv("a,a,c\n1,2,3\n");
        let err = CategoricalReader::new(f.path()).with_target("c").read().unwrap_err();
        assert!(matches!(err, IoError::DuplicateColumn { ref name, .. } if name == "a"));
    }

    #[test]
    fn no_feature_columns_error() {
        let f = write_csv("play\nyes\nno\n");
        let err = CategoricalReader::new(f.path()).with_target("play").read().unwrap_err();
        assert!(matches!(err, IoError::NoFeatureColumns { .. }));
    }

    #[test]
    fn empty_selection_error() {
        let f = write_csv(WEATHER);
        let none: [&str; 0] = [];
        let err = CategoricalReader::new(f.path())
            .with_target("play")
            .with_features(none)
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::NoFeatureColumns { .. }));
    }

    #[test]
    fn empty_dataset_error() {
        let f = write_csv("outlook,play\n");
        let err = CategoricalReader::new(f.path()).with_target("play").read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn inconsistent_row_length_error() {
        let f = write_csv("outlook,wind,play\nsunny,weak,no\nrain,yes\n");
        let err = CategoricalReader::new(f.path()).with_target("play").read().unwrap_err();
        assert!(matches!(
            err,
            IoError::InconsistentRowLength { row_index: 1, expected: 3, got: 2, .. }
        ));
    }

    #[test]
    fn unlabeled_rows_skip_target() {
        let f = write_csv("outlook,wind,play\nsunny,weak,\nrain,strong,\n");
        let rows = CategoricalReader::new(f.path())
            .with_target("play")
            .read_unlabeled()
            .unwrap();
        assert_eq!(rows, vec![vec!["sunny", "weak"], vec!["rain", "strong"]]);
    }

    #[test]
    fn unlabeled_rows_without_target_column() {
        let f = write_csv("wind,outlook\nweak,sunny\n");
        let rows = CategoricalReader::new(f.path())
            .with_target("play")
            .with_features(["outlook", "wind"])
            .read_unlabeled()
            .unwrap();
        assert_eq!(rows, vec![vec!["sunny", "weak"]]);
    }
}
