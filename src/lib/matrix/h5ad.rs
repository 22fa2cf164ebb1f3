//! AnnData (`.h5ad`) input through the HDF5 backend.

use crate::core::error::{ConvertError, Result};
use crate::matrix::ExpressionMatrix;
use anndata::data::*;
use anndata::{AnnData, AnnDataOp, ArrayElemOp, AxisArraysOp, Backend, ElemCollectionOp};
use anndata_hdf5::H5;
use log::{debug, info, warn};
use polars::prelude::DataFrame;
use std::collections::BTreeMap;
use std::path::Path;

/// Read every part of an `.h5ad` file: X, obs/var names, obs/var tables,
/// obsm/varm/obsp/varp arrays, layers and `uns`.
///
/// An `uns` entry the backend cannot decode is skipped with a warning.
pub fn read_h5ad<P: AsRef<Path>>(path: P) -> Result<ExpressionMatrix> {
    let path = path.as_ref();
    info!("Reading H5AD file: {}", path.display());

    if !path.exists() {
        return Err(ConvertError::FileNotFound(path.to_path_buf()));
    }

    let adata = AnnData::<H5>::open(H5::open(path)?)?;
    info!("AnnData shape: {} obs × {} vars", adata.n_obs(), adata.n_vars());

    let obs_names = adata.obs_names().into_vec();
    let var_names = adata.var_names().into_vec();

    let x = adata.x().get::<ArrayData>()?.ok_or_else(|| {
        ConvertError::InvalidInput(format!("{} has no X matrix", path.display()))
    })?;

    let obs = read_table(adata.read_obs(), "obs");
    let var = read_table(adata.read_var(), "var");

    let obsm = read_axis_arrays(adata.obsm(), "obsm")?;
    let varm = read_axis_arrays(adata.varm(), "varm")?;
    let obsp = read_axis_arrays(adata.obsp(), "obsp")?;
    let varp = read_axis_arrays(adata.varp(), "varp")?;
    let layers = read_axis_arrays(adata.layers(), "layers")?;

    let mut uns = BTreeMap::new();
    let uns_ref = adata.uns();
    for key in uns_ref.keys() {
        match uns_ref.get_item::<Data>(&key) {
            Ok(Some(data)) => {
                debug!("  - Loaded uns '{}'", key);
                uns.insert(key, data);
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping uns '{}': {:?}", key, e),
        }
    }

    adata.close()?;

    info!(
        "Loaded {} obsm, {} varm, {} obsp, {} varp, {} layers and {} uns entries",
        obsm.len(),
        varm.len(),
        obsp.len(),
        varp.len(),
        layers.len(),
        uns.len()
    );

    Ok(ExpressionMatrix {
        x,
        obs_names,
        var_names,
        obs,
        var,
        obsm,
        varm,
        obsp,
        varp,
        layers,
        uns,
    })
}

fn read_axis_arrays<A: AxisArraysOp>(
    arrays: A,
    label: &str,
) -> Result<BTreeMap<String, ArrayData>> {
    let mut out = BTreeMap::new();
    for key in arrays.keys() {
        if let Some(array) = arrays.get_item::<ArrayData>(&key)? {
            debug!("  - Loaded {} '{}'", label, key);
            out.insert(key, array);
        }
    }
    Ok(out)
}

fn read_table(result: anyhow::Result<DataFrame>, axis: &str) -> DataFrame {
    match result {
        Ok(df) => {
            debug!(
                "Read {} table: {} rows, {} columns",
                axis,
                df.height(),
                df.width()
            );
            df
        }
        Err(e) => {
            warn!("Failed to read {} table: {:?}, continuing without it", axis, e);
            DataFrame::empty()
        }
    }
}
