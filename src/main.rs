use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use arbor_io::{CategoricalDataset, CategoricalReader, DEFAULT_SEED, ExperimentName, HoldoutConfig, ResultWriter};
use arbor_tree::DecisionTreeClassifier;

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "ID3 decision-tree classification for categorical CSV data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for the train/validation split
    #[arg(long, default_value_t = DEFAULT_SEED, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel prediction (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Training table and column selection shared by every subcommand.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Path to the training CSV file (headered)
    #[arg(long)]
    data: PathBuf,

    /// Name of the class label column
    #[arg(long)]
    target: String,

    /// Comma-separated feature column names (defaults to every non-target column)
    #[arg(long, value_delimiter = ',')]
    features: Option<Vec<String>>,
}

impl DataArgs {
    fn reader(&self) -> CategoricalReader {
        let reader = CategoricalReader::new(&self.data).with_target(self.target.as_str());
        match &self.features {
            Some(names) => reader.with_features(names.iter().cloned()),
            None => reader,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Fit a tree on a random training share and score it on the rest
    Fit {
        #[command(flatten)]
        data: DataArgs,

        /// Expected share of rows held out for validation, in [0, 1)
        #[arg(long, default_value_t = 0.15)]
        validation_fraction: f64,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Print the fitted tree as indented rules on stderr
        #[arg(long)]
        print_tree: bool,
    },

    /// Fit on all training rows and label every row of another CSV
    Classify {
        #[command(flatten)]
        data: DataArgs,

        /// Path to the CSV file with rows to classify
        #[arg(long)]
        input: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct FitOutput {
    experiment: String,
    target: String,
    n_samples: usize,
    n_training: usize,
    n_validation: usize,
    n_features: usize,
    n_nodes: usize,
    n_leaves: usize,
    depth: usize,
    majority: String,
    validation_accuracy: Option<f64>,
    tree_path: PathBuf,
    evaluate_path: Option<PathBuf>,
}

#[derive(Serialize)]
struct ClassifyOutput {
    experiment: String,
    n_training: usize,
    n_rows: usize,
    n_features: usize,
    majority: String,
    predict_path: PathBuf,
}

fn read_dataset(data: &DataArgs) -> Result<CategoricalDataset> {
    let dataset = data.reader().read().context("failed to read training CSV")?;
    info!(
        n_samples = dataset.n_samples(),
        n_features = dataset.n_features(),
        "dataset loaded"
    );
    Ok(dataset)
}

fn fit_model(dataset: &CategoricalDataset) -> Result<DecisionTreeClassifier<String, String>> {
    let mut model = DecisionTreeClassifier::new();
    model
        .fit(dataset.rows(), dataset.labels())
        .context("tree induction failed")?;
    Ok(model)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Fit {
            data,
            validation_fraction,
            experiment,
            output_dir,
            print_tree,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Read dataset
            let dataset = read_dataset(&data)?;

            // 2. Split into training and validation rows
            let split = HoldoutConfig::new(validation_fraction)?
                .with_seed(cli.seed)
                .split(dataset.n_samples());
            if split.training().is_empty() {
                anyhow::bail!(
                    "holdout split left no training rows (seed {}, validation fraction {validation_fraction})",
                    cli.seed
                );
            }
            let training = dataset.subset(split.training());
            let validation = dataset.subset(split.validation());
            info!(
                n_training = training.n_samples(),
                n_validation = validation.n_samples(),
                "holdout split"
            );

            // 3. Fit
            let model = fit_model(&training)?;
            let tree = model.tree().context("model is not fitted")?;
            let majority = model.majority().context("model is not fitted")?.clone();
            let exported = model.export()?;

            if print_tree {
                eprint!("{}", exported.display_with_names(dataset.feature_names()));
            }

            // 4. Score on the held-out rows
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let (validation_accuracy, evaluate_path) = if validation.n_samples() == 0 {
                warn!("no validation rows drawn; skipping evaluation");
                (None, None)
            } else {
                let confusion = model
                    .evaluate(validation.rows(), validation.labels())
                    .context("validation scoring failed")?;
                info!(accuracy = confusion.accuracy(), "validation scored");
                let path = writer.write_evaluation(&confusion)?;
                (Some(confusion.accuracy()), Some(path))
            };

            // 5. Write tree JSON
            let tree_path = writer.write_tree(
                &exported,
                dataset.feature_names(),
                dataset.target_name(),
                &majority,
                training.n_samples(),
            )?;

            // 6. Print summary
            let output = FitOutput {
                experiment,
                target: dataset.target_name().to_string(),
                n_samples: dataset.n_samples(),
                n_training: training.n_samples(),
                n_validation: validation.n_samples(),
                n_features: dataset.n_features(),
                n_nodes: tree.n_nodes(),
                n_leaves: tree.n_leaves(),
                depth: tree.depth(),
                majority,
                validation_accuracy,
                tree_path,
                evaluate_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Classify {
            data,
            input,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Read training data and fit on every row
            let dataset = read_dataset(&data)?;
            let model = fit_model(&dataset)?;
            let majority = model.majority().context("model is not fitted")?.clone();

            // 2. Read the rows to classify, selecting the training columns
            let rows = CategoricalReader::new(&input)
                .with_target(data.target.as_str())
                .with_features(dataset.feature_names().iter().cloned())
                .read_unlabeled()
                .context("failed to read input CSV")?;
            info!(n_rows = rows.len(), "input rows loaded");

            // 3. Predict
            let predictions = model.predict(&rows).context("prediction failed")?;

            // 4. Write predictions JSON
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let predict_path = writer.write_predictions(&predictions)?;

            // 5. Print summary
            let output = ClassifyOutput {
                experiment,
                n_training: dataset.n_samples(),
                n_rows: predictions.len(),
                n_features: dataset.n_features(),
                majority,
                predict_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
