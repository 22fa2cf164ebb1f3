//! AnnData (`.h5ad`) output.

use crate::core::error::Result;
use crate::core::fs::remove_existing;
use crate::matrix::ExpressionMatrix;
use anndata::data::array::dataframe::DataFrameIndex;
use anndata::{AnnData, AnnDataOp, AxisArraysOp, ElemCollectionOp};
use anndata_hdf5::H5;
use log::{debug, info};
use std::path::Path;

/// Serialize the whole matrix to `path`, replacing any existing file.
///
/// The obs table is always written; the var table only when it has columns.
/// A failure part-way through may leave a partial file behind.
pub fn write_h5ad<P: AsRef<Path>>(matrix: &ExpressionMatrix, path: P) -> Result<()> {
    let path = path.as_ref();
    matrix.validate_dimensions()?;
    info!("Writing AnnData to: {}", path.display());

    remove_existing(path)?;
    let adata = AnnData::<H5>::new(path)?;

    let obs_index: DataFrameIndex = matrix.obs_names.iter().cloned().collect();
    let var_index: DataFrameIndex = matrix.var_names.iter().cloned().collect();
    adata.set_obs_names(obs_index)?;
    adata.set_var_names(var_index)?;

    adata.set_x(matrix.x.clone())?;
    info!(
        "  - Written X matrix: {}×{}",
        matrix.n_obs(),
        matrix.n_vars()
    );

    adata.set_obs(matrix.obs.clone())?;
    info!(
        "  - Written obs annotations: {} rows, {} columns",
        matrix.obs.height(),
        matrix.obs.width()
    );

    if matrix.var.width() > 0 {
        adata.set_var(matrix.var.clone())?;
        info!(
            "  - Written var annotations: {} rows, {} columns",
            matrix.var.height(),
            matrix.var.width()
        );
    }

    for (key, array) in &matrix.obsm {
        adata.obsm().add(key, array.clone())?;
        info!("  - Written obsm '{}'", key);
    }
    for (key, array) in &matrix.varm {
        adata.varm().add(key, array.clone())?;
        info!("  - Written varm '{}'", key);
    }
    for (key, array) in &matrix.obsp {
        adata.obsp().add(key, array.clone())?;
        info!("  - Written obsp '{}'", key);
    }
    for (key, array) in &matrix.varp {
        adata.varp().add(key, array.clone())?;
        info!("  - Written varp '{}'", key);
    }

    for (key, array) in &matrix.layers {
        adata.layers().add(key, array.clone())?;
        info!("  - Written layer '{}'", key);
    }

    for (key, data) in &matrix.uns {
        adata.uns().add(key, data.clone())?;
        debug!("  - Written uns '{}'", key);
    }
    if !matrix.uns.is_empty() {
        info!("  - Written {} uns entries", matrix.uns.len());
    }

    adata.close()?;
    info!(
        "Successfully wrote AnnData with shape: {} × {}",
        matrix.n_obs(),
        matrix.n_vars()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::h5ad::read_h5ad;
    use crate::pipeline::join::{join_spatial, SPATIAL_KEY};
    use crate::spatial::{SpatialRecord, SpatialTable};
    use anndata::data::{ArrayData, Data};
    use nalgebra_sparse::{CooMatrix, CsrMatrix};
    use ndarray::{ArrayD, Ix2};

    fn spot(barcode: &str, x: f64, y: f64) -> SpatialRecord {
        SpatialRecord {
            barcode: barcode.to_string(),
            in_tissue: 1.0,
            x_pos: x,
            y_pos: y,
        }
    }

    fn joined_matrix() -> ExpressionMatrix {
        let coo = CooMatrix::try_from_triplets(
            3,
            2,
            vec![0, 1, 2],
            vec![0, 1, 1],
            vec![1.0f32, 4.0, 2.5],
        )
        .unwrap();
        let x = ArrayData::from(CsrMatrix::from(&coo));
        let mut matrix = ExpressionMatrix::new(
            x,
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            vec!["Gapdh".to_string(), "Actb".to_string()],
        )
        .unwrap();
        let table =
            SpatialTable::from_records(vec![spot("A", 10.0, 20.0), spot("B", 30.0, 40.0)]).unwrap();
        join_spatial(&mut matrix, &table).unwrap();
        matrix
    }

    fn coordinates(array: ArrayData) -> ndarray::Array2<f64> {
        ArrayD::<f64>::try_from(array)
            .unwrap()
            .into_dimensionality::<Ix2>()
            .unwrap()
    }

    #[test]
    fn round_trip_preserves_matrix_names_and_spatial_array() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("joined.h5ad");
        let written = joined_matrix();

        write_h5ad(&written, &path)?;
        let read = read_h5ad(&path)?;

        assert_eq!(read.obs_names, written.obs_names);
        assert_eq!(read.var_names, written.var_names);

        let before = CsrMatrix::<f32>::try_from(written.x.clone()).unwrap();
        let after = CsrMatrix::<f32>::try_from(read.x.clone()).unwrap();
        assert_eq!(before.csr_data(), after.csr_data());

        let before = coordinates(written.obsm[SPATIAL_KEY].clone());
        let after = coordinates(read.obsm[SPATIAL_KEY].clone());
        assert_eq!(after.dim(), (3, 2));
        for (b, a) in before.iter().zip(after.iter()) {
            assert!((b.is_nan() && a.is_nan()) || b == a);
        }

        assert_eq!(read.obs.height(), 3);
        assert!(read.obs.column("x_pos").is_ok());
        Ok(())
    }

    #[test]
    fn round_trip_keeps_uns_and_pairwise_arrays() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("annotated.h5ad");
        let mut written = joined_matrix();
        let scalefactors = ndarray::arr1(&[0.08f64, 0.25]).into_dyn();
        written.uns.insert(
            "scalefactors".to_string(),
            Data::ArrayData(ArrayData::from(scalefactors.clone())),
        );
        written.obsp.insert(
            "distances".to_string(),
            ArrayData::from(CsrMatrix::<f32>::identity(3)),
        );
        written.varm.insert(
            "PCs".to_string(),
            ArrayData::from(ndarray::Array2::<f32>::ones((2, 1)).into_dyn()),
        );

        write_h5ad(&written, &path)?;
        let read = read_h5ad(&path)?;

        match read.uns.get("scalefactors") {
            Some(Data::ArrayData(array)) => {
                assert_eq!(ArrayD::<f64>::try_from(array.clone()).unwrap(), scalefactors);
            }
            other => panic!("uns entry lost: {other:?}"),
        }
        let distances = read.obsp["distances"].shape();
        let dims: &[usize] = distances.as_ref();
        assert_eq!(dims, [3, 3].as_slice());
        let loadings = read.varm["PCs"].shape();
        let dims: &[usize] = loadings.as_ref();
        assert_eq!(dims, [2, 1].as_slice());
        Ok(())
    }

    #[test]
    fn existing_output_is_overwritten() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("joined.h5ad");
        std::fs::write(&path, b"not an hdf5 file")?;

        write_h5ad(&joined_matrix(), &path)?;
        assert_eq!(read_h5ad(&path)?.n_obs(), 3);
        Ok(())
    }

    #[test]
    fn unwritable_output_is_an_error() {
        let matrix = joined_matrix();
        assert!(write_h5ad(&matrix, "/nonexistent-dir/for/sure/out.h5ad").is_err());
    }
}
