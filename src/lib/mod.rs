//! make-h5ad: spatial expression matrices to AnnData
//!
//! The library converts a gene expression matrix plus a spatial barcode file
//! into a single `.h5ad` container. The observation table is left-joined with
//! the spot coordinates and the `(x_pos, y_pos)` pairs are stored as
//! `obsm["spatial"]`.
//!
//! # Modules
//!
//! - [`core`]: errors, file helpers, name handling and sparse construction
//! - [`matrix`]: expression matrix loaders (`.h5ad`, 10x `.h5`, loom, Matrix Market, text)
//! - [`spatial`]: the headerless barcode/coordinate table
//! - [`pipeline`]: the spatial join and the `.h5ad` writer

pub mod core;
pub mod matrix;
pub mod pipeline;
pub mod spatial;

pub mod prelude {
    pub use crate::core::prelude::*;
    pub use crate::matrix::{load_matrix, ExpressionMatrix, MatrixFormat};
    pub use crate::pipeline::{join_spatial, write_h5ad, JoinSummary, SPATIAL_KEY};
    pub use crate::spatial::{SpatialRecord, SpatialTable, SPATIAL_COLUMNS};
}
