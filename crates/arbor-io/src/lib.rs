//! File I/O, dataset splitting, and result serialization for arbor.

mod domain;
mod error;
mod reader;
mod split;
mod writer;

pub use domain::{CategoricalDataset, ExperimentName};
pub use error::IoError;
pub use reader::CategoricalReader;
pub use split::{DEFAULT_SEED, HoldoutConfig, HoldoutSplit, holdout_split};
pub use writer::ResultWriter;
