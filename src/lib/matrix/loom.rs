//! Loom files (`.loom`).
//!
//! A loom file keeps a dense genes × cells `/matrix`, extra matrices of the
//! same shape under `/layers`, and per-axis attributes under `/row_attrs`
//! (genes) and `/col_attrs` (cells). The matrix is transposed to cells ×
//! genes and stored sparse. `col_attrs/CellID` and `row_attrs/Gene` name the
//! observations and features; other one-dimensional attributes become obs/var
//! columns.

use crate::core::error::{ConvertError, Result};
use crate::core::names;
use crate::core::sparse::SparseOps;
use crate::matrix::ExpressionMatrix;
use anndata::backend::{DatasetOp, GroupOp};
use anndata::data::ArrayData;
use anndata::Backend;
use anndata_hdf5::H5;
use log::{debug, info};
use nalgebra_sparse::CsrMatrix;
use ndarray::{Array2, ArrayView2, Ix1, Ix2};
use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use std::path::Path;

const CELL_ID: &str = "CellID";
const GENE: &str = "Gene";

/// Read a loom file into a sparse [`ExpressionMatrix`].
pub fn read_loom<P: AsRef<Path>>(path: P) -> Result<ExpressionMatrix> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConvertError::FileNotFound(path.to_path_buf()));
    }
    info!("Reading loom file: {}", path.display());

    let file = H5::open(path)?;
    let counts: Array2<f32> = file.open_dataset("matrix")?.read_array::<f32, Ix2>()?;
    let (n_vars, n_obs) = counts.dim();
    let x = cells_by_genes(counts.view())?;

    let (obs_names, obs) = read_attrs(&file, "col_attrs", CELL_ID, n_obs)?;
    let (var_names, var) = read_attrs(&file, "row_attrs", GENE, n_vars)?;

    let mut matrix = ExpressionMatrix::new(ArrayData::from(x), obs_names, var_names)?;
    matrix.obs = obs;
    matrix.var = var;

    if file.exists("layers")? {
        let layers = file.open_group("layers")?;
        for key in layers.list()? {
            let layer: Array2<f32> = layers.open_dataset(&key)?.read_array::<f32, Ix2>()?;
            if layer.dim() != (n_vars, n_obs) {
                return Err(ConvertError::DimensionMismatch {
                    expected: format!("loom layer '{}' {}×{}", key, n_vars, n_obs),
                    actual: format!("{:?}", layer.dim()),
                });
            }
            debug!("  - Loaded layer '{}'", key);
            matrix
                .layers
                .insert(key, ArrayData::from(cells_by_genes(layer.view())?));
        }
    }

    info!(
        "Loom matrix: {} cells × {} genes, {} layers",
        n_obs,
        n_vars,
        matrix.layers.len()
    );
    Ok(matrix)
}

/// Names from `name_attr` plus every other one-dimensional attribute of
/// length `n` as a table column. Names fall back to positions.
fn read_attrs<G: GroupOp<H5>>(
    file: &G,
    group_name: &str,
    name_attr: &str,
    n: usize,
) -> Result<(Vec<String>, DataFrame)> {
    if !file.exists(group_name)? {
        return Ok((names::positional(n), DataFrame::empty()));
    }
    let group = file.open_group(group_name)?;

    let mut index = None;
    let mut columns: Vec<Column> = Vec::new();
    for key in group.list()? {
        let dataset = group.open_dataset(&key)?;
        let shape = dataset.shape();
        let dims: &[usize] = shape.as_ref();
        if dims != [n].as_slice() {
            debug!("Skipping {}/{} with shape {:?}", group_name, key, dims);
            continue;
        }

        if key == name_attr {
            index = Some(
                dataset
                    .read_array::<String, Ix1>()?
                    .into_raw_vec_and_offset()
                    .0,
            );
        } else if let Ok(values) = dataset.read_array::<f64, Ix1>() {
            columns.push(Series::new(key.as_str().into(), values.to_vec()).into());
        } else if let Ok(values) = dataset.read_array::<String, Ix1>() {
            columns.push(Series::new(key.as_str().into(), values.to_vec()).into());
        } else {
            debug!("Skipping {}/{}: unsupported element type", group_name, key);
        }
    }

    let names = index.unwrap_or_else(|| names::positional(n));
    let table = if columns.is_empty() {
        DataFrame::empty()
    } else {
        DataFrame::new(columns)?
    };
    Ok((names, table))
}

/// Transpose a dense genes × cells matrix into sparse cells × genes.
pub(crate) fn cells_by_genes(counts: ArrayView2<f32>) -> Result<CsrMatrix<f32>> {
    let (n_genes, n_cells) = counts.dim();
    let triplets: Vec<(usize, usize, f32)> = counts
        .indexed_iter()
        .filter(|(_, v)| **v != 0.0)
        .map(|((gene, cell), &v)| (cell, gene, v))
        .collect();
    SparseOps::from_triplets(n_cells, n_genes, triplets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn genes_by_cells_is_transposed() -> Result<()> {
        let counts = array![[1.0f32, 0.0, 3.0], [0.0, 0.0, 4.0]];
        let x = cells_by_genes(counts.view())?;

        assert_eq!((x.nrows(), x.ncols()), (3, 2));
        assert_eq!(x.nnz(), 3);
        assert_eq!(x.row(0).values(), &[1.0]);
        assert_eq!(x.row(1).nnz(), 0);
        assert_eq!(x.row(2).col_indices(), &[0, 1]);
        assert_eq!(x.row(2).values(), &[3.0, 4.0]);
        Ok(())
    }

    #[test]
    fn empty_matrix_keeps_its_shape() -> Result<()> {
        let x = cells_by_genes(Array2::<f32>::zeros((4, 0)).view())?;
        assert_eq!((x.nrows(), x.ncols()), (0, 4));
        Ok(())
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(matches!(
            read_loom("/nonexistent/sample.loom"),
            Err(ConvertError::FileNotFound(_))
        ));
    }
}
