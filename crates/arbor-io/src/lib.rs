//! CSV table reading and JSON artifact writing for arbor runs.

mod domain;
mod error;
mod table_reader;
mod writer;

pub use domain::{ExperimentName, LabeledDataset};
pub use error::IoError;
pub use table_reader::LabeledTableReader;
pub use writer::{EvaluationSummary, ResultWriter, TrainingSummary};
