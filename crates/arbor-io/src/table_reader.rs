//! CSV feature table reader with full input validation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::LabeledDataset;

/// Reads a numeric feature table, with an optional integer label column.
///
/// Expected CSV format:
/// - Header row required, one name per column
/// - The label column may sit anywhere; every other column is a feature
/// - All rows must have the same number of columns
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::DuplicateColumn`] | Header repeats a name |
/// | [`IoError::MissingLabelColumn`] | Label column not in header |
/// | [`IoError::NoFeatureColumns`] | Nothing left besides the label |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Feature cell is NaN, Inf, or unparseable |
/// | [`IoError::InvalidLabel`] | Label cell is not an integer |
pub struct LabeledTableReader {
    path: PathBuf,
    label_column: Option<String>,
}

impl LabeledTableReader {
    /// Create a reader that treats every column as a feature.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            label_column: None,
        }
    }

    /// Read labels from the named column.
    #[must_use]
    pub fn with_label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = Some(column.into());
        self
    }

    /// Read and validate the CSV file, returning a [`LabeledDataset`].
    #[instrument(skip(self), fields(path = %self.path.display(), label = ?self.label_column))]
    pub fn read(&self) -> Result<LabeledDataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so short rows surface as InconsistentRowLength.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        let mut seen = HashSet::new();
        for name in &header {
            if !seen.insert(name) {
                return Err(IoError::DuplicateColumn {
                    path: self.path.clone(),
                    column: name.to_string(),
                });
            }
        }

        let label_index = match &self.label_column {
            Some(column) => Some(header.iter().position(|h| h == column).ok_or_else(|| {
                IoError::MissingLabelColumn {
                    path: self.path.clone(),
                    column: column.clone(),
                }
            })?),
            None => None,
        };

        let feature_columns: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .filter(|&(i, _)| Some(i) != label_index)
            .map(|(i, name)| (i, name.to_string()))
            .collect();
        if feature_columns.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }

        let mut features = Vec::new();
        let mut labels = label_index.map(|_| Vec::new());

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

            let mut row = Vec::with_capacity(feature_columns.len());
            for (col_index, column) in &feature_columns {
                let raw = &record[*col_index];
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        column: column.clone(),
                        raw: raw.to_string(),
                    })?;
                row.push(value);
            }
            features.push(row);

            if let (Some(index), Some(labels)) = (label_index, labels.as_mut()) {
                labels.push(self.parse_label(&record[index], row_index)?);
            }
        }

        if features.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_samples = features.len(),
            n_features = feature_columns.len(),
            labeled = labels.is_some(),
            "table loaded"
        );

        let feature_names = feature_columns.into_iter().map(|(_, name)| name).collect();
        Ok(LabeledDataset::new(feature_names, features, labels))
    }

    /// Accept integers and integral floats such as `"2.0"`.
    fn parse_label(&self, raw: &str, row_index: usize) -> Result<i64, IoError> {
        if let Ok(label) = raw.parse::<i64>() {
            return Ok(label);
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
            _ => Err(IoError::InvalidLabel {
                path: self.path.clone(),
                row_index,
                raw: raw.to_string(),
            }),
        }
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
