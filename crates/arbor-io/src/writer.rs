//! JSON artifact writer for training runs and predictions.

use std::fs;
use std::path::{Path, PathBuf};

use arbor_forest::{ClassMetrics, Probabilities, Targets};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// What a training run produced, borrowed from the caller.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary<'a> {
    pub n_samples: usize,
    pub feature_names: &'a [String],
    /// Sorted class labels per output.
    pub classes: &'a [Vec<i64>],
    /// The configuration the adapter was built from, as JSON.
    pub configuration: serde_json::Value,
    pub n_estimators: usize,
    /// Tree count after each incremental call.
    pub growth: &'a [usize],
    pub feature_importances: &'a [f64],
    pub evaluation: Option<EvaluationSummary<'a>>,
}

/// Held-out evaluation of a trained model.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary<'a> {
    pub n_samples: usize,
    pub accuracy: f64,
    pub confusion_matrix: &'a [Vec<usize>],
    pub class_metrics: &'a [ClassMetrics],
}

/// Writes run artifacts to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_train.json` and
/// `{experiment}_predictions.json`.
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

    /// Write a training summary to `{experiment}_train.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Encode`] or [`IoError::WriteFile`] if the file
    /// cannot be produced.
    #[instrument(skip_all)]
    pub fn write_training(&self, summary: &TrainingSummary<'_>) -> Result<PathBuf, IoError> {
        let model_path = self.model_path();
        let artifact = TrainArtifact {
            experiment: self.experiment.as_str(),
            model_path: &model_path,
            summary,
        };
        let path = self.artifact_path("train");
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "training summary written");
        Ok(path)
    }

    /// Write predictions to `{experiment}_predictions.json`.
    ///
    /// One entry per row, holding a label and a class distribution per output.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Encode`] or [`IoError::WriteFile`] if the file
    /// cannot be produced.
    #[instrument(skip_all)]
    pub fn write_predictions(
        &self,
        classes: &[Vec<i64>],
        labels: &Targets,
        probabilities: &Probabilities,
    ) -> Result<PathBuf, IoError> {
        let predictions: Vec<PredictionEntry> = (0..labels.n_rows())
            .map(|row| {
                let labels = match labels {
                    Targets::Single(l) => vec![l[row]],
                    Targets::Multi(rows) => rows[row].clone(),
                };
                let probabilities = match probabilities {
                    Probabilities::Single(rows) => vec![rows[row].as_slice()],
                    Probabilities::Multi(outputs) => {
                        outputs.iter().map(|o| o[row].as_slice()).collect()
                    }
                };
                PredictionEntry { row, labels, probabilities }
            })
            .collect();

        let artifact = PredictArtifact {
            experiment: self.experiment.as_str(),
            n_rows: predictions.len(),
            classes,
            predictions,
        };
        let path = self.artifact_path("predictions");
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    /// Return the path where the model binary should be saved.
    ///
    /// Does not write anything. Computes `{output_dir}/{experiment}_model.bin`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_model.bin", self.experiment.as_str()))
    }

    fn artifact_path(&self, kind: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{kind}.json", self.experiment.as_str()))
    }

    fn write_json(&self, path: &Path, artifact: &impl Serialize) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Encode {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct TrainArtifact<'a> {
    experiment: &'a str,
    model_path: &'a Path,
    #[serde(flatten)]
    summary: &'a TrainingSummary<'a>,
}

#[derive(Serialize)]
struct PredictArtifact<'a> {
    experiment: &'a str,
    n_rows: usize,
    classes: &'a [Vec<i64>],
    predictions: Vec<PredictionEntry<'a>>,
}

#[derive(Serialize)]
struct PredictionEntry<'a> {
    row: usize,
    labels: Vec<i64>,
    probabilities: Vec<&'a [f64]>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn write_training_json_structure() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("rf_run".into()).unwrap();
        let writer = ResultWriter::new(dir.path(), experiment).unwrap();

        let names = vec!["a".to_string(), "b".to_string()];
        let classes = vec![vec![0, 1]];
        let summary = TrainingSummary {
            n_samples: 10,
            feature_names: &names,
            classes: &classes,
            configuration: serde_json::json!({"n_estimators": 20}),
            n_estimators: 20,
            growth: &[10, 20],
            feature_importances: &[0.75, 0.25],
            evaluation: None,
        };
        let path = writer.write_training(&summary).unwrap();
        assert_eq!(path, dir.path().join("rf_run_train.json"));

        let content = read_json(&path);
        assert_eq!(content["experiment"], "rf_run");
        assert_eq!(content["n_estimators"], 20);
        assert_eq!(content["growth"], serde_json::json!([10, 20]));
        assert_eq!(content["configuration"]["n_estimators"], 20);
        assert!(content["model_path"].as_str().unwrap().ends_with("rf_run_model.bin"));
        assert!(content["evaluation"].is_null());
    }

    #[test]
    fn write_predictions_single_output() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("pred".into()).unwrap();
        let writer = ResultWriter::new(dir.path(), experiment).unwrap();

        let labels = Targets::Single(vec![1, 0]);
        let probs = Probabilities::Single(vec![vec![0.2, 0.8], vec![0.9, 0.1]]);
        let path = writer.write_predictions(&[vec![0, 1]], &labels, &probs).unwrap();

        let content = read_json(&path);
        assert_eq!(content["n_rows"], 2);
        let first = &content["predictions"][0];
        assert_eq!(first["labels"], serde_json::json!([1]));
        assert_eq!(first["probabilities"], serde_json::json!([[0.2, 0.8]]));
    }

    #[test]
    fn write_predictions_multi_output() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("multi".into()).unwrap();
        let writer = ResultWriter::new(dir.path(), experiment).unwrap();

        let labels = Targets::Multi(vec![vec![0, 3]]);
        let probs = Probabilities::Multi(vec![vec![vec![1.0, 0.0]], vec![vec![0.4, 0.6]]]);
        let path = writer
            .write_predictions(&[vec![0, 1], vec![2, 3]], &labels, &probs)
            .unwrap();

        let entry = &read_json(&path)["predictions"][0];
        assert_eq!(entry["labels"], serde_json::json!([0, 3]));
        assert_eq!(entry["probabilities"][1], serde_json::json!([0.4, 0.6]));
    }

    #[test]
    fn writer_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let experiment = ExperimentName::new("nested_test".into()).unwrap();
        let writer = ResultWriter::new(&nested, experiment).unwrap();
        assert!(nested.is_dir());
        assert_eq!(writer.model_path(), nested.join("nested_test_model.bin"));
    }
}
