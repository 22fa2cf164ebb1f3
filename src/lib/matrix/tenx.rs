//! 10x Genomics feature-barcode matrices (`.h5`).
//!
//! Cell Ranger stores counts as a genes × barcodes CSC matrix:
//!
//! ```text
//! /matrix/{barcodes, data, indices, indptr, shape}
//! /matrix/features/{id, name, feature_type}        (Cell Ranger 3+)
//! /<genome>/{barcodes, data, indices, indptr, shape, genes, gene_names}  (Cell Ranger 2)
//! ```
//!
//! Read column-wise it is a barcodes × genes CSR matrix, which is the
//! observation-major layout used everywhere else. Only "Gene Expression"
//! features are kept when feature types are present. Feature names become
//! var names, with the feature ids kept in the `gene_ids` var column.
//!
//! An `.h5` file without either layout but with an `X` element is read as
//! AnnData.

use crate::core::error::{ConvertError, Result};
use crate::core::sparse::SparseOps;
use crate::matrix::{h5ad, ExpressionMatrix};
use anndata::backend::{DatasetOp, GroupOp};
use anndata::data::ArrayData;
use anndata::Backend;
use anndata_hdf5::H5;
use log::{debug, info};
use nalgebra_sparse::CsrMatrix;
use ndarray::Ix1;
use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use std::path::Path;

const GENE_EXPRESSION: &str = "Gene Expression";

/// Read an HDF5 counts file, choosing between the 10x layouts and AnnData.
pub fn read_h5<P: AsRef<Path>>(path: P) -> Result<ExpressionMatrix> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConvertError::FileNotFound(path.to_path_buf()));
    }

    let file = H5::open(path)?;
    let members = file.list()?;

    if members.iter().any(|m| m == "matrix") {
        info!("Reading 10x HDF5 (v3) file: {}", path.display());
        let group = file.open_group("matrix")?;
        let features = group.open_group("features")?;
        let names = read_strings(&features, "name")?;
        let ids = read_strings(&features, "id")?;
        let types = if features.exists("feature_type")? {
            Some(read_strings(&features, "feature_type")?)
        } else {
            None
        };
        return read_counts(path, &group, names, ids, types);
    }

    if members.iter().any(|m| m == "X") {
        debug!("{} has an X element, reading as AnnData", path.display());
        return h5ad::read_h5ad(path);
    }

    for genome in &members {
        let group = file.open_group(genome)?;
        if group.exists("indptr")? && group.exists("gene_names")? {
            info!(
                "Reading 10x HDF5 (v2) file: {} (genome '{}')",
                path.display(),
                genome
            );
            let names = read_strings(&group, "gene_names")?;
            let ids = read_strings(&group, "genes")?;
            return read_counts(path, &group, names, ids, None);
        }
    }

    Err(ConvertError::InvalidInput(format!(
        "{} is neither a 10x feature-barcode matrix nor an AnnData file",
        path.display()
    )))
}

fn read_strings<G: GroupOp<H5>>(group: &G, name: &str) -> Result<Vec<String>> {
    Ok(group
        .open_dataset(name)?
        .read_array::<String, Ix1>()?
        .into_raw_vec_and_offset()
        .0)
}

fn read_counts<G: GroupOp<H5>>(
    path: &Path,
    group: &G,
    names: Vec<String>,
    ids: Vec<String>,
    types: Option<Vec<String>>,
) -> Result<ExpressionMatrix> {
    let barcodes = read_strings(group, "barcodes")?;
    let data = group
        .open_dataset("data")?
        .read_array::<f32, Ix1>()?
        .into_raw_vec_and_offset()
        .0;
    let indices = read_indices(group, "indices")?;
    let indptr = read_indices(group, "indptr")?;

    if ids.len() != names.len() {
        return Err(ConvertError::InvalidInput(format!(
            "{}: {} feature ids but {} feature names",
            path.display(),
            ids.len(),
            names.len()
        )));
    }

    let keep: Vec<bool> = match &types {
        Some(types) if types.iter().any(|t| t == GENE_EXPRESSION) => {
            types.iter().map(|t| t == GENE_EXPRESSION).collect()
        }
        _ => vec![true; names.len()],
    };
    let x = cells_by_genes(barcodes.len(), &keep, &data, &indices, &indptr)?;

    let (var_names, gene_ids): (Vec<String>, Vec<String>) = names
        .into_iter()
        .zip(ids)
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|(pair, _)| pair)
        .unzip();
    let mut columns: Vec<Column> = vec![Series::new("gene_ids".into(), gene_ids).into()];
    if let Some(types) = types {
        let kept: Vec<String> = types
            .into_iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(t, _)| t)
            .collect();
        columns.push(Series::new("feature_types".into(), kept).into());
    }

    info!(
        "10x matrix: {} barcodes × {} features ({} stored values)",
        x.nrows(),
        x.ncols(),
        x.nnz()
    );

    let mut matrix = ExpressionMatrix::new(ArrayData::from(x), barcodes, var_names)?;
    matrix.var = DataFrame::new(columns)?;
    Ok(matrix)
}

fn read_indices<G: GroupOp<H5>>(group: &G, name: &str) -> Result<Vec<usize>> {
    group
        .open_dataset(name)?
        .read_array::<i64, Ix1>()?
        .iter()
        .map(|&v| {
            usize::try_from(v).map_err(|_| {
                ConvertError::InvalidInput(format!("negative value {} in '{}'", v, name))
            })
        })
        .collect()
}

/// Reinterpret a genes × barcodes CSC matrix as barcodes × kept-genes CSR.
///
/// `keep` has one flag per gene; dropped genes are removed and the remaining
/// columns renumbered in order.
pub(crate) fn cells_by_genes(
    n_barcodes: usize,
    keep: &[bool],
    data: &[f32],
    indices: &[usize],
    indptr: &[usize],
) -> Result<CsrMatrix<f32>> {
    if indptr.len() != n_barcodes + 1 {
        return Err(ConvertError::DimensionMismatch {
            expected: format!("indptr of length {}", n_barcodes + 1),
            actual: format!("length {}", indptr.len()),
        });
    }
    if data.len() != indices.len() || indptr.last().copied() != Some(data.len()) {
        return Err(ConvertError::InvalidInput(format!(
            "data ({}), indices ({}) and indptr end ({:?}) disagree",
            data.len(),
            indices.len(),
            indptr.last()
        )));
    }

    let mut column_of = Vec::with_capacity(keep.len());
    let mut n_kept = 0;
    for &k in keep {
        column_of.push(k.then_some(n_kept));
        n_kept += usize::from(k);
    }

    let mut triplets = Vec::with_capacity(data.len());
    for (barcode, bounds) in indptr.windows(2).enumerate() {
        let (start, end) = (bounds[0], bounds[1]);
        if start > end || end > data.len() {
            return Err(ConvertError::InvalidInput(format!(
                "indptr out of order at barcode {}",
                barcode
            )));
        }
        for entry in start..end {
            let gene = indices[entry];
            match column_of.get(gene) {
                Some(Some(col)) => triplets.push((barcode, *col, data[entry])),
                Some(None) => {}
                None => {
                    return Err(ConvertError::InvalidInput(format!(
                        "gene index {} exceeds {} features",
                        gene,
                        keep.len()
                    )))
                }
            }
        }
    }

    SparseOps::from_triplets(n_barcodes, n_kept, triplets)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 3 genes × 2 barcodes:
    //   g0: [1, 0]
    //   g1: [0, 5]
    //   g2: [2, 7]
    fn csc() -> (Vec<f32>, Vec<usize>, Vec<usize>) {
        (vec![1.0, 2.0, 5.0, 7.0], vec![0, 2, 1, 2], vec![0, 2, 4])
    }

    #[test]
    fn columns_become_observation_rows() -> Result<()> {
        let (data, indices, indptr) = csc();
        let x = cells_by_genes(2, &[true, true, true], &data, &indices, &indptr)?;

        assert_eq!((x.nrows(), x.ncols()), (2, 3));
        let row = x.row(0);
        assert_eq!(row.col_indices(), &[0, 2]);
        assert_eq!(row.values(), &[1.0, 2.0]);
        let row = x.row(1);
        assert_eq!(row.col_indices(), &[1, 2]);
        assert_eq!(row.values(), &[5.0, 7.0]);
        Ok(())
    }

    #[test]
    fn dropped_features_renumber_columns() -> Result<()> {
        let (data, indices, indptr) = csc();
        let x = cells_by_genes(2, &[true, false, true], &data, &indices, &indptr)?;

        assert_eq!(x.ncols(), 2);
        assert_eq!(x.row(1).col_indices(), &[1]);
        assert_eq!(x.row(1).values(), &[7.0]);
        Ok(())
    }

    #[test]
    fn inconsistent_pointers_are_rejected() {
        let (data, indices, _) = csc();
        assert!(matches!(
            cells_by_genes(3, &[true; 3], &data, &indices, &[0, 2, 4]),
            Err(ConvertError::DimensionMismatch { .. })
        ));
        assert!(cells_by_genes(2, &[true; 2], &data, &indices, &[0, 2, 4]).is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(matches!(
            read_h5("/nonexistent/filtered_feature_bc_matrix.h5"),
            Err(ConvertError::FileNotFound(_))
        ));
    }
}
