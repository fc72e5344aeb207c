use ndarray::{Array2, ArrayView1};
use serde::Deserialize;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MatrixError {
    #[error("dense matrix expects {expected} values for shape {rows}x{cols}, got {found}")]
    DenseLength {
        rows: usize,
        cols: usize,
        expected: usize,
        found: usize,
    },

    #[error("csr indptr must have {expected} entries, got {found}")]
    IndptrLength { expected: usize, found: usize },

    #[error("csr indptr is not monotonically non-decreasing at row {0}")]
    IndptrOrder(usize),

    #[error("csr indices ({indices}) and data ({data}) must both hold {nnz} entries")]
    NonZeroCount { nnz: usize, indices: usize, data: usize },

    #[error("csr column index {index} out of bounds for {cols} columns")]
    ColumnOutOfBounds { index: usize, cols: usize },

    #[error("matrix shape {rows}x{cols} is too large")]
    ShapeTooLarge { rows: usize, cols: usize },
}

/// Number of `f32` cells in a `rows x cols` matrix, if it can be allocated.
fn cell_count(rows: usize, cols: usize) -> Result<usize, MatrixError> {
    rows.checked_mul(cols)
        .filter(|&cells| {
            cells
                .checked_mul(std::mem::size_of::<f32>())
                .is_some_and(|bytes| bytes <= isize::MAX as usize)
        })
        .ok_or(MatrixError::ShapeTooLarge { rows, cols })
}

/// On-disk layout of a feature matrix. Sparse exports keep scipy's CSR
/// triple, dense exports are row-major.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
enum MatrixRepr {
    Dense {
        rows: usize,
        cols: usize,
        data: Vec<f32>,
    },
    Csr {
        shape: (usize, usize),
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f32>,
    },
}

/// Row-per-entity feature matrix consumed by the scorer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "MatrixRepr")]
pub struct FeatureMatrix {
    values: Array2<f32>,
}

impl FeatureMatrix {
    pub fn from_array(values: Array2<f32>) -> Self {
        Self { values }
    }

    /// One-hot rows, the layout used when an entity has no side features.
    pub fn identity(n: usize) -> Self {
        Self {
            values: Array2::eye(n),
        }
    }

    pub fn from_dense(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, MatrixError> {
        let expected = cell_count(rows, cols)?;
        let found = data.len();
        Array2::from_shape_vec((rows, cols), data)
            .map(Self::from_array)
            .map_err(|_| MatrixError::DenseLength {
                rows,
                cols,
                expected,
                found,
            })
    }

    pub fn from_csr(
        shape: (usize, usize),
        indptr: &[usize],
        indices: &[usize],
        data: &[f32],
    ) -> Result<Self, MatrixError> {
        let (rows, cols) = shape;
        cell_count(rows, cols)?;
        if indptr.len().checked_sub(1) != Some(rows) {
            return Err(MatrixError::IndptrLength {
                expected: rows.saturating_add(1),
                found: indptr.len(),
            });
        }

        let nnz = indptr[rows];
        if indices.len() != nnz || data.len() != nnz {
            return Err(MatrixError::NonZeroCount {
                nnz,
                indices: indices.len(),
                data: data.len(),
            });
        }

        let mut values = Array2::<f32>::zeros((rows, cols));
        for row in 0..rows {
            let (start, end) = (indptr[row], indptr[row + 1]);
            if start > end || end > nnz {
                return Err(MatrixError::IndptrOrder(row));
            }
            for pos in start..end {
                let col = indices[pos];
                if col >= cols {
                    return Err(MatrixError::ColumnOutOfBounds { index: col, cols });
                }
                // scipy sums duplicate entries
                values[[row, col]] += data[pos];
            }
        }

        Ok(Self { values })
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f32> {
        self.values.row(index)
    }
}

impl TryFrom<MatrixRepr> for FeatureMatrix {
    type Error = MatrixError;

    fn try_from(repr: MatrixRepr) -> Result<Self, Self::Error> {
        match repr {
            MatrixRepr::Dense { rows, cols, data } => Self::from_dense(rows, cols, data),
            MatrixRepr::Csr {
                shape,
                indptr,
                indices,
                data,
            } => Self::from_csr(shape, &indptr, &indices, &data),
        }
    }
}
