//! Expression matrix loading
//!
//! An [`ExpressionMatrix`] is the in-memory form of an annotated matrix:
//! observations (cells or spots) on rows, features (genes) on columns, an
//! observation table, a feature table, axis-aligned and pairwise arrays, layers
//! and unstructured `uns` entries.
//!
//! - [`h5ad`]: AnnData containers, read through `anndata-hdf5`
//! - [`tenx`]: 10x Genomics `.h5` feature-barcode matrices
//! - [`loom`]: loom files
//! - [`mtx`]: Matrix Market coordinate files
//! - [`text`]: delimited dense text matrices
//!
//! [`load_matrix`] picks the reader from the file extension and enforces the
//! shared post-conditions (unique feature names, consistent dimensions).

pub mod h5ad;
pub mod loom;
pub mod mtx;
pub mod tenx;
pub mod text;

use crate::core::error::{ConvertError, Result};
use crate::core::io::content_extension;
use crate::core::names;
use anndata::data::*;
use log::{info, warn};
use polars::prelude::DataFrame;
use std::collections::BTreeMap;
use std::path::Path;

pub use text::Delimiter;

/// Supported on-disk layouts for the expression matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixFormat {
    H5ad,
    /// `.h5`: a 10x feature-barcode matrix, or AnnData under another name.
    Hdf5,
    Loom,
    MatrixMarket,
    Text(Delimiter),
}

impl MatrixFormat {
    /// Infer the format from the file extension, ignoring a trailing `.gz`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = content_extension(path).unwrap_or_default();
        match extension.as_str() {
            "h5ad" => Ok(MatrixFormat::H5ad),
            "h5" => Ok(MatrixFormat::Hdf5),
            "loom" => Ok(MatrixFormat::Loom),
            "mtx" => Ok(MatrixFormat::MatrixMarket),
            "csv" => Ok(MatrixFormat::Text(Delimiter::Comma)),
            "tsv" | "tab" => Ok(MatrixFormat::Text(Delimiter::Tab)),
            "txt" | "data" => Ok(MatrixFormat::Text(Delimiter::Whitespace)),
            _ => Err(ConvertError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

/// Annotated expression matrix held fully in memory.
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    pub x: ArrayData,
    pub obs_names: Vec<String>,
    pub var_names: Vec<String>,
    pub obs: DataFrame,
    pub var: DataFrame,
    pub obsm: BTreeMap<String, ArrayData>,
    pub varm: BTreeMap<String, ArrayData>,
    pub obsp: BTreeMap<String, ArrayData>,
    pub varp: BTreeMap<String, ArrayData>,
    pub layers: BTreeMap<String, ArrayData>,
    /// Unstructured entries (`uns`), e.g. Visium scale factors and images.
    pub uns: BTreeMap<String, Data>,
}

impl ExpressionMatrix {
    /// Matrix with empty observation/feature tables and no auxiliary arrays.
    pub fn new(x: ArrayData, obs_names: Vec<String>, var_names: Vec<String>) -> Result<Self> {
        let matrix = Self {
            x,
            obs_names,
            var_names,
            obs: DataFrame::empty(),
            var: DataFrame::empty(),
            obsm: BTreeMap::new(),
            varm: BTreeMap::new(),
            obsp: BTreeMap::new(),
            varp: BTreeMap::new(),
            layers: BTreeMap::new(),
            uns: BTreeMap::new(),
        };
        matrix.validate_dimensions()?;
        Ok(matrix)
    }

    #[inline]
    pub fn n_obs(&self) -> usize {
        self.obs_names.len()
    }

    #[inline]
    pub fn n_vars(&self) -> usize {
        self.var_names.len()
    }

    /// Check X, tables, axis-aligned arrays and layers against the name lists.
    pub fn validate_dimensions(&self) -> Result<()> {
        let expected = (self.n_obs(), self.n_vars());
        check_shape("X", &self.x, expected)?;

        if self.obs.width() > 0 && self.obs.height() != expected.0 {
            return Err(ConvertError::DimensionMismatch {
                expected: format!("obs table with {} rows", expected.0),
                actual: format!("{} rows", self.obs.height()),
            });
        }

        if self.var.width() > 0 && self.var.height() != expected.1 {
            return Err(ConvertError::DimensionMismatch {
                expected: format!("var table with {} rows", expected.1),
                actual: format!("{} rows", self.var.height()),
            });
        }

        for (key, array) in &self.obsm {
            check_rows(&format!("obsm['{}']", key), array, expected.0)?;
        }
        for (key, array) in &self.varm {
            check_rows(&format!("varm['{}']", key), array, expected.1)?;
        }
        for (key, array) in &self.obsp {
            check_shape(&format!("obsp['{}']", key), array, (expected.0, expected.0))?;
        }
        for (key, array) in &self.varp {
            check_shape(&format!("varp['{}']", key), array, (expected.1, expected.1))?;
        }
        for (key, array) in &self.layers {
            check_shape(&format!("layer '{}'", key), array, expected)?;
        }

        Ok(())
    }

    /// Drop observation/feature tables whose height disagrees with the names.
    pub fn fix_table_dimensions(&mut self) {
        if self.obs.width() > 0 && self.obs.height() != self.n_obs() {
            warn!(
                "obs table height ({}) doesn't match n_obs ({}), discarding its columns",
                self.obs.height(),
                self.n_obs()
            );
            self.obs = DataFrame::empty();
        }

        if self.var.width() > 0 && self.var.height() != self.n_vars() {
            warn!(
                "var table height ({}) doesn't match n_vars ({}), discarding its columns",
                self.var.height(),
                self.n_vars()
            );
            self.var = DataFrame::empty();
        }
    }

    /// Rename repeated feature names in place, see [`names::make_unique`].
    pub fn var_names_make_unique(&mut self) -> usize {
        let renamed = names::make_unique(&mut self.var_names);
        if renamed > 0 {
            info!("Renamed {} duplicated feature names", renamed);
        }
        renamed
    }
}

fn check_shape(label: &str, array: &ArrayData, expected: (usize, usize)) -> Result<()> {
    let shape = array.shape();
    let dims: &[usize] = shape.as_ref();
    if dims != [expected.0, expected.1].as_slice() {
        return Err(ConvertError::DimensionMismatch {
            expected: format!("{} {}×{}", label, expected.0, expected.1),
            actual: format!("{} {:?}", label, dims),
        });
    }
    Ok(())
}

fn check_rows(label: &str, array: &ArrayData, rows: usize) -> Result<()> {
    let shape = array.shape();
    let dims: &[usize] = shape.as_ref();
    if dims.first() != Some(&rows) {
        return Err(ConvertError::DimensionMismatch {
            expected: format!("{} with {} rows", label, rows),
            actual: format!("shape {:?}", dims),
        });
    }
    Ok(())
}

/// Read an expression matrix, inferring the reader from the extension.
///
/// Feature names are made unique; repeated observation names are kept and
/// reported, since they only affect how the spatial join resolves.
pub fn load_matrix<P: AsRef<Path>>(path: P) -> Result<ExpressionMatrix> {
    let path = path.as_ref();
    let format = MatrixFormat::from_path(path)?;
    info!("Reading expression matrix {} as {:?}", path.display(), format);

    let mut matrix = match format {
        MatrixFormat::H5ad => h5ad::read_h5ad(path)?,
        MatrixFormat::Hdf5 => tenx::read_h5(path)?,
        MatrixFormat::Loom => loom::read_loom(path)?,
        MatrixFormat::MatrixMarket => mtx::read_mtx(path)?,
        MatrixFormat::Text(delimiter) => text::read_text(path, delimiter)?,
    };

    matrix.fix_table_dimensions();
    matrix.var_names_make_unique();

    let repeated = names::duplicated(&matrix.obs_names);
    if !repeated.is_empty() {
        warn!(
            "{} observation names occur more than once (first: '{}')",
            repeated.len(),
            repeated[0]
        );
    }

    matrix.validate_dimensions()?;
    info!(
        "Loaded expression matrix with shape: {} × {}",
        matrix.n_obs(),
        matrix.n_vars()
    );
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::CsrMatrix;
    use polars::prelude::Series;
    use std::io::Write;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(MatrixFormat::from_path("a.h5ad").unwrap(), MatrixFormat::H5ad);
        assert_eq!(
            MatrixFormat::from_path("a.mtx.gz").unwrap(),
            MatrixFormat::MatrixMarket
        );
        assert_eq!(
            MatrixFormat::from_path("dge.txt.gz").unwrap(),
            MatrixFormat::Text(Delimiter::Whitespace)
        );
        assert_eq!(
            MatrixFormat::from_path("a.CSV").unwrap(),
            MatrixFormat::Text(Delimiter::Comma)
        );
        assert_eq!(
            MatrixFormat::from_path("filtered_feature_bc_matrix.h5").unwrap(),
            MatrixFormat::Hdf5
        );
        assert_eq!(MatrixFormat::from_path("a.loom").unwrap(), MatrixFormat::Loom);
        assert!(matches!(
            MatrixFormat::from_path("a.xlsx"),
            Err(ConvertError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn new_rejects_mismatched_names() {
        let x = ArrayData::from(CsrMatrix::<f32>::zeros(2, 3));
        let err = ExpressionMatrix::new(x, names(&["A", "B", "C"]), names(&["g1", "g2", "g3"]))
            .unwrap_err();
        assert!(matches!(err, ConvertError::DimensionMismatch { .. }));
    }

    #[test]
    fn pairwise_arrays_must_be_square() -> Result<()> {
        let x = ArrayData::from(CsrMatrix::<f32>::zeros(2, 3));
        let mut matrix = ExpressionMatrix::new(x, names(&["A", "B"]), names(&["g1", "g2", "g3"]))?;

        matrix
            .obsp
            .insert("connectivities".to_string(), ArrayData::from(CsrMatrix::<f32>::zeros(2, 2)));
        matrix
            .varm
            .insert("PCs".to_string(), ArrayData::from(ndarray::Array2::<f32>::zeros((3, 4)).into_dyn()));
        matrix.validate_dimensions()?;

        matrix
            .varp
            .insert("corr".to_string(), ArrayData::from(CsrMatrix::<f32>::zeros(2, 2)));
        assert!(matches!(
            matrix.validate_dimensions(),
            Err(ConvertError::DimensionMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn short_tables_are_discarded() -> Result<()> {
        let x = ArrayData::from(CsrMatrix::<f32>::zeros(2, 1));
        let mut matrix = ExpressionMatrix::new(x, names(&["A", "B"]), names(&["g1"]))?;
        matrix.obs = DataFrame::new(vec![Series::new("batch".into(), vec!["b1"]).into()])?;
        assert!(matrix.validate_dimensions().is_err());

        matrix.fix_table_dimensions();
        assert_eq!(matrix.obs.width(), 0);
        matrix.validate_dimensions()
    }

    #[test]
    fn load_matrix_makes_feature_names_unique() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("counts.csv");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, ",Gapdh,Actb,Gapdh")?;
        writeln!(file, "A,1,0,2")?;
        writeln!(file, "B,0,3,0")?;
        drop(file);

        let matrix = load_matrix(&path)?;
        assert_eq!(matrix.obs_names, names(&["A", "B"]));
        assert_eq!(matrix.var_names, names(&["Gapdh", "Actb", "Gapdh-1"]));
        Ok(())
    }
}
