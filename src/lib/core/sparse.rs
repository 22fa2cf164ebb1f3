//! Sparse matrix construction shared by the text-based loaders

use crate::core::error::{ConvertError, Result};
use itertools::Itertools;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

pub struct SparseOps;

impl SparseOps {
    /// Build a CSR matrix from zero-based `(row, col, value)` triplets.
    ///
    /// Repeated coordinates are summed, as in the Matrix Market convention.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: Vec<(usize, usize, f32)>,
    ) -> Result<CsrMatrix<f32>> {
        if nrows == 0 || ncols == 0 || triplets.is_empty() {
            return Ok(CsrMatrix::zeros(nrows, ncols));
        }

        for &(row, col, _) in &triplets {
            if row >= nrows || col >= ncols {
                return Err(ConvertError::InvalidInput(format!(
                    "Index ({}, {}) exceeds matrix dimensions ({}, {})",
                    row, col, nrows, ncols
                )));
            }
        }

        let (row_indices, col_indices, values): (Vec<_>, Vec<_>, Vec<_>) =
            triplets.into_iter().multiunzip();

        let coo = CooMatrix::try_from_triplets(nrows, ncols, row_indices, col_indices, values)
            .map_err(|e| ConvertError::SparseMatrix(format!("COO creation failed: {:?}", e)))?;

        Ok(CsrMatrix::from(&coo))
    }

    /// Fraction of stored entries, stored entries, total cells.
    pub fn density_stats(matrix: &CsrMatrix<f32>) -> (f64, usize, usize) {
        let total_elements = matrix.nrows() * matrix.ncols();
        let nnz = matrix.nnz();
        let density = if total_elements > 0 {
            nnz as f64 / total_elements as f64
        } else {
            0.0
        };
        (density, nnz, total_elements)
    }
}
