//! Model persistence: a bincode header followed by the bincode-encoded forest.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::RfError;
use crate::forest::RandomForestClassifier;

const FORMAT_VERSION: u32 = 3;

/// Written ahead of the forest so a version mismatch is caught before the
/// body is decoded.
#[derive(Debug, Serialize, Deserialize)]
struct ModelHeader {
    format_version: u32,
    n_trees: usize,
    n_features: usize,
    n_outputs: usize,
}

impl RandomForestClassifier {
    /// Save the forest, its hyperparameters and its training schema.
    ///
    /// A saved warm-start forest can be loaded and grown further.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::WriteModel`] | the file cannot be created or flushed |
    /// | [`RfError::SerializeModel`] | bincode encoding failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display(), n_trees = self.n_trained()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RfError> {
        let path = path.as_ref();
        let write_error = |source| RfError::WriteModel {
            path: path.to_path_buf(),
            source,
        };

        let mut out = BufWriter::new(File::create(path).map_err(write_error)?);
        let header = ModelHeader {
            format_version: FORMAT_VERSION,
            n_trees: self.n_trained(),
            n_features: self.n_features(),
            n_outputs: self.n_outputs(),
        };
        bincode::serialize_into(&mut out, &header)
            .and_then(|()| bincode::serialize_into(&mut out, self))
            .map_err(|source| RfError::SerializeModel { source })?;
        out.flush().map_err(write_error)?;

        info!("model saved");
        Ok(())
    }

    /// Load a forest written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | the file cannot be opened |
    /// | [`RfError::DeserializeModel`] | bincode decoding failed |
    /// | [`RfError::IncompatibleModelVersion`] | the header carries another format version |
    /// | [`RfError::CorruptModel`] | the decoded forest disagrees with the header |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RfError::ReadModel {
            path: path.to_path_buf(),
            source,
        })?;
        let mut input = BufReader::new(file);
        let decode_error = |source| RfError::DeserializeModel {
            path: path.to_path_buf(),
            source,
        };

        let header: ModelHeader = bincode::deserialize_from(&mut input).map_err(decode_error)?;
        if header.format_version != FORMAT_VERSION {
            return Err(RfError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: header.format_version,
                path: path.to_path_buf(),
            });
        }

        let forest: Self = bincode::deserialize_from(&mut input).map_err(decode_error)?;
        if forest.n_trained() != header.n_trees {
            return Err(RfError::CorruptModel {
                path: path.to_path_buf(),
                header_trees: header.n_trees,
                body_trees: forest.n_trained(),
            });
        }

        debug!(
            n_trees = header.n_trees,
            n_features = header.n_features,
            n_outputs = header.n_outputs,
            "model loaded"
        );
        Ok(forest)
    }
}
