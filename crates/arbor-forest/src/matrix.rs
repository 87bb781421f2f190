//! Dense and sparse feature matrices.

use std::borrow::Cow;

use crate::error::RfError;

/// A compressed sparse row (CSR) matrix.
///
/// Row `i` stores its non-zero entries at positions
/// `indptr[i]..indptr[i + 1]` of `indices` (column) and `data` (value).
/// Entries not stored are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
    n_cols: usize,
}

impl CsrMatrix {
    /// Build a CSR matrix from its raw components.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidSparseMatrix`] when `indptr` is empty or not
    /// non-decreasing, when its last entry differs from `data.len()`, when
    /// `indices` and `data` differ in length, or when a column index is out
    /// of range.
    pub fn new(
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f64>,
        n_cols: usize,
    ) -> Result<Self, RfError> {
        let invalid = |reason: String| RfError::InvalidSparseMatrix { reason };

        if indptr.is_empty() {
            return Err(invalid("indptr must hold at least one entry".into()));
        }
        if indices.len() != data.len() {
            return Err(invalid(format!(
                "{} column indices for {} values",
                indices.len(),
                data.len()
            )));
        }
        if indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(invalid("indptr must be non-decreasing".into()));
        }
        let last = indptr[indptr.len() - 1];
        if indptr[0] != 0 || last != data.len() {
            return Err(invalid(format!(
                "indptr must span 0..{}, got {}..{last}",
                data.len(),
                indptr[0]
            )));
        }
        if let Some(&col) = indices.iter().find(|&&c| c >= n_cols) {
            return Err(invalid(format!("column index {col} >= n_cols {n_cols}")));
        }
        Ok(Self {
            indptr,
            indices,
            data,
            n_cols,
        })
    }

    /// Build a CSR matrix from dense rows, dropping exact zeros.
    #[must_use]
    pub fn from_dense(rows: &[Vec<f64>]) -> Self {
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for row in rows {
            for (col, &value) in row.iter().enumerate() {
                if value != 0.0 {
                    indices.push(col);
                    data.push(value);
                }
            }
            indptr.push(data.len());
        }
        Self {
            indptr,
            indices,
            data,
            n_cols,
        }
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.indptr.len() - 1
    }

    /// Return the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Return the number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    fn dense_row(&self, row: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.n_cols];
        for k in self.indptr[row]..self.indptr[row + 1] {
            out[self.indices[k]] = self.data[k];
        }
        out
    }
}

/// Training or prediction input: rows are samples, columns are features.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureMatrix {
    /// Row-major dense values: `rows[sample_idx][feature_idx]`.
    Dense(Vec<Vec<f64>>),
    /// Compressed sparse rows.
    Sparse(CsrMatrix),
}

impl FeatureMatrix {
    /// Return the number of samples.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        match self {
            FeatureMatrix::Dense(rows) => rows.len(),
            FeatureMatrix::Sparse(csr) => csr.n_rows(),
        }
    }

    /// Return the number of feature columns (taken from the first row when dense).
    #[must_use]
    pub fn n_cols(&self) -> usize {
        match self {
            FeatureMatrix::Dense(rows) => rows.first().map_or(0, Vec::len),
            FeatureMatrix::Sparse(csr) => csr.n_cols(),
        }
    }

    /// Return a sample as a dense slice.
    ///
    /// Borrowed for dense input, materialized for sparse input.
    #[must_use]
    pub fn row(&self, row: usize) -> Cow<'_, [f64]> {
        match self {
            FeatureMatrix::Dense(rows) => Cow::Borrowed(rows[row].as_slice()),
            FeatureMatrix::Sparse(csr) => Cow::Owned(csr.dense_row(row)),
        }
    }

    /// Check shape and finiteness for training.
    ///
    /// Returns `(n_samples, n_features)`.
    pub(crate) fn validate(&self) -> Result<(usize, usize), RfError> {
        let n_samples = self.n_rows();
        if n_samples == 0 {
            return Err(RfError::EmptyDataset);
        }
        let n_features = self.n_cols();
        if n_features == 0 {
            return Err(RfError::ZeroFeatures);
        }
        match self {
            FeatureMatrix::Dense(rows) => {
                for (sample_index, row) in rows.iter().enumerate() {
                    if row.len() != n_features {
                        return Err(RfError::FeatureCountMismatch {
                            expected: n_features,
                            got: row.len(),
                            sample_index,
                        });
                    }
                    if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
                        return Err(RfError::NonFiniteValue {
                            sample_index,
                            feature_index,
                        });
                    }
                }
            }
            FeatureMatrix::Sparse(csr) => {
                for sample_index in 0..n_samples {
                    for k in csr.indptr[sample_index]..csr.indptr[sample_index + 1] {
                        if !csr.data[k].is_finite() {
                            return Err(RfError::NonFiniteValue {
                                sample_index,
                                feature_index: csr.indices[k],
                            });
                        }
                    }
                }
            }
        }
        Ok((n_samples, n_features))
    }

    /// Convert to column-major layout: `columns[feature_idx][sample_idx]`.
    pub(crate) fn to_columns(&self) -> Vec<Vec<f64>> {
        let n_samples = self.n_rows();
        let n_features = self.n_cols();
        match self {
            FeatureMatrix::Dense(rows) => (0..n_features)
                .map(|feat_idx| rows.iter().map(|row| row[feat_idx]).collect())
                .collect(),
            FeatureMatrix::Sparse(csr) => {
                let mut columns = vec![vec![0.0; n_samples]; n_features];
                for row in 0..n_samples {
                    for k in csr.indptr[row]..csr.indptr[row + 1] {
                        columns[csr.indices[k]][row] = csr.data[k];
                    }
                }
                columns
            }
        }
    }
}

impl From<Vec<Vec<f64>>> for FeatureMatrix {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        FeatureMatrix::Dense(rows)
    }
}

impl From<CsrMatrix> for FeatureMatrix {
    fn from(csr: CsrMatrix) -> Self {
        FeatureMatrix::Sparse(csr)
    }
}
