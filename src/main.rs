use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use arbor_automl::{ClassificationAlgorithm, ESTIMATOR_INCREMENT, RandomForest};
use arbor_forest::{ConfusionMatrix, RandomForestClassifier, Targets};
use arbor_io::{
    EvaluationSummary, ExperimentName, LabeledDataset, LabeledTableReader, ResultWriter,
    TrainingSummary,
};
use arbor_space::{Configuration, Value};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Incrementally trained random forests for AutoML configuration search")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the random forest hyperparameter search space as JSON
    Space,

    /// Print the random forest capability flags as JSON
    Properties,

    /// Sample configurations from the search space
    Sample {
        /// Number of configurations to draw
        #[arg(long, default_value_t = 5)]
        count: usize,
    },

    /// Grow a forest incrementally from a labeled CSV and save it
    Train {
        /// Path to the training CSV file
        #[arg(long)]
        data: PathBuf,

        /// Name of the integer label column
        #[arg(long)]
        label: String,

        /// JSON configuration file; missing entries take search space defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the number of trees
        #[arg(long)]
        n_estimators: Option<usize>,

        /// Trees added per incremental call
        #[arg(long, default_value_t = ESTIMATOR_INCREMENT)]
        increment: usize,

        /// Worker threads for tree construction (engine default if not set)
        #[arg(long)]
        n_jobs: Option<usize>,

        /// Held-out CSV with the same columns, evaluated after training
        #[arg(long)]
        test: Option<PathBuf>,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: ExperimentName,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Predict labels and class probabilities with a saved model
    Predict {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to the CSV file to score
        #[arg(long)]
        data: PathBuf,

        /// Label column to drop from the features and score against
        #[arg(long)]
        label: Option<String>,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: ExperimentName,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    experiment: String,
    n_samples: usize,
    n_features: usize,
    n_trees: usize,
    n_calls: usize,
    test_accuracy: Option<f64>,
    model_path: PathBuf,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_rows: usize,
    model_n_trees: usize,
    model_n_features: usize,
    accuracy: Option<f64>,
}

fn read_table(path: &Path, label: Option<&str>) -> Result<LabeledDataset> {
    let reader = LabeledTableReader::new(path);
    let reader = match label {
        Some(column) => reader.with_label_column(column),
        None => reader,
    };
    reader
        .read()
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Overlay a configuration file onto the search space defaults.
fn load_configuration(path: Option<&Path>, n_estimators: Option<usize>) -> Result<Configuration> {
    let space = RandomForest::hyperparameter_search_space();
    let mut config = space.default_configuration();
    if let Some(path) = path {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let overrides: Configuration = serde_json::from_str(&text)
            .with_context(|| format!("invalid configuration JSON in {}", path.display()))?;
        for (name, value) in overrides.iter() {
            config.insert(name, value.clone());
        }
    }
    if let Some(n) = n_estimators {
        let n = i64::try_from(n).context("n_estimators out of range")?;
        config.insert("n_estimators", Value::Int(n));
    }
    if let Err(e) = space.check_configuration(&config) {
        warn!(error = %e, "configuration leaves the search space");
    }
    Ok(config)
}

fn score(classes: &[i64], truth: &[i64], predicted: &Targets) -> Result<ConfusionMatrix> {
    let predicted = predicted
        .as_single()
        .context("expected single-output predictions")?;
    ConfusionMatrix::from_labels(truth, predicted, classes).context("failed to score predictions")
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

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Space => {
            let space = RandomForest::hyperparameter_search_space();
            println!("{}", serde_json::to_string_pretty(&space)?);
        }

        Command::Properties => {
            println!("{}", serde_json::to_string_pretty(&RandomForest::properties())?);
        }

        Command::Sample { count } => {
            let space = RandomForest::hyperparameter_search_space();
            let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
            let samples: Vec<Configuration> = (0..count)
                .map(|_| space.sample_configuration(&mut rng))
                .collect();
            println!("{}", serde_json::to_string_pretty(&samples)?);
        }

        Command::Train {
            data,
            label,
            config,
            n_estimators,
            increment,
            n_jobs,
            test,
            experiment,
            output_dir,
        } => {
            // 1. Read training data
            let dataset = read_table(&data, Some(&label))?;
            let x = dataset.to_matrix();
            let y = dataset.targets().context("training table has no labels")?;

            // 2. Build the adapter
            let configuration = load_configuration(config.as_deref(), n_estimators)?;
            let mut rf = RandomForest::from_configuration(&configuration, Some(cli.seed), n_jobs)
                .context("failed to build random forest from configuration")?;

            // 3. Grow until fully fitted
            let mut growth = Vec::new();
            while !rf.configuration_fully_fitted() {
                rf.iterative_fit(&x, &y, None, increment, false)
                    .context("incremental fit failed")?;
                growth.push(rf.trained_tree_count());
                info!(trees = rf.trained_tree_count(), "forest grown");
            }
            let forest = rf.estimator().context("adapter holds no fitted forest")?;
            let target = rf
                .normalized_config()
                .map_or(forest.n_trained(), |c| c.n_estimators);

            // 4. Optional held-out evaluation
            let evaluation = match &test {
                Some(path) => {
                    let held_out = read_table(path, Some(&label))?;
                    let predicted = rf
                        .predict(&held_out.to_matrix())
                        .context("prediction on test data failed")?;
                    let truth = held_out.labels().context("test table has no labels")?;
                    let cm = score(&forest.classes()[0], truth, &predicted)?;
                    info!(
                        accuracy = cm.accuracy(),
                        macro_f1 = cm.macro_f1(),
                        "held-out evaluation complete"
                    );
                    info!("confusion matrix\n{cm}");
                    Some((held_out.n_samples(), cm))
                }
                None => None,
            };

            // 5. Save model and training summary
            let writer = ResultWriter::new(&output_dir, experiment.clone())?;
            forest
                .save(writer.model_path())
                .context("failed to save model")?;

            let importances = forest.feature_importances();
            let metrics = evaluation.as_ref().map(|(_, cm)| cm.class_metrics());
            let summary = TrainingSummary {
                n_samples: dataset.n_samples(),
                feature_names: dataset.feature_names(),
                classes: forest.classes(),
                configuration: serde_json::to_value(&configuration)?,
                n_estimators: target,
                growth: &growth,
                feature_importances: &importances,
                evaluation: evaluation.as_ref().zip(metrics.as_deref()).map(
                    |((n_samples, cm), class_metrics)| EvaluationSummary {
                        n_samples: *n_samples,
                        accuracy: cm.accuracy(),
                        confusion_matrix: cm.as_rows(),
                        class_metrics,
                    },
                ),
            };
            writer.write_training(&summary)?;

            // 6. Print summary
            let output = TrainOutput {
                experiment: experiment.to_string(),
                n_samples: dataset.n_samples(),
                n_features: dataset.n_features(),
                n_trees: forest.n_trained(),
                n_calls: growth.len(),
                test_accuracy: evaluation.as_ref().map(|(_, cm)| cm.accuracy()),
                model_path: writer.model_path(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            data,
            label,
            experiment,
            output_dir,
        } => {
            // 1. Load model
            let forest = RandomForestClassifier::load(&model).context("failed to load model")?;
            info!(
                n_trees = forest.n_trained(),
                n_features = forest.n_features(),
                "model loaded"
            );

            // 2. Read data and predict
            let dataset = read_table(&data, label.as_deref())?;
            let x = dataset.to_matrix();
            let labels = forest.predict(&x).context("prediction failed")?;
            let probabilities = forest.predict_proba(&x).context("prediction failed")?;

            let accuracy = match dataset.labels() {
                Some(truth) => {
                    let cm = score(&forest.classes()[0], truth, &labels)?;
                    info!("confusion matrix\n{cm}");
                    Some(cm.accuracy())
                }
                None => None,
            };

            // 3. Write predictions JSON
            let writer = ResultWriter::new(&output_dir, experiment.clone())?;
            writer.write_predictions(forest.classes(), &labels, &probabilities)?;

            // 4. Print summary
            let output = PredictOutput {
                experiment: experiment.to_string(),
                n_rows: dataset.n_samples(),
                model_n_trees: forest.n_trained(),
                model_n_features: forest.n_features(),
                accuracy,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
