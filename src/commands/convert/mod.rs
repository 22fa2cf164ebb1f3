//! Spatial expression matrix to AnnData conversion
//!
//! Reads the expression matrix and the headerless spatial barcode file,
//! left-joins the coordinates onto the observation table, stores them as
//! `obsm["spatial"]` and writes everything to a single `.h5ad` file.

pub mod args;
pub mod pipeline;

pub use args::ConvertArgs;
pub use pipeline::run_convert;
