//! make-h5ad - spatial expression matrices to AnnData
//!
//! Converts a digital gene expression matrix and a spatial barcode file into a
//! single `.h5ad` container. Observation metadata is left-joined with the spot
//! table on barcode, and the `(x_pos, y_pos)` pairs are attached as
//! `obsm["spatial"]`.
//!
//! # Usage
//!
//! ```bash
//! make-h5ad --counts dge.txt.gz --spatial_coordinates barcodes.csv --output sample.h5ad
//! ```
//!
//! The spatial file is headerless with four columns:
//! `barcode,in_tissue,x_pos,y_pos`.

extern crate make_h5ad_lib;
pub mod commands;
use env_logger::Env;
use log::*;
use make_h5ad_lib::core::error::is_broken_pipe;
use structopt::StructOpt;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = commands::ConvertArgs::from_args();
    if let Err(err) = commands::run_convert(args) {
        if is_broken_pipe(&err) {
            std::process::exit(0);
        }
        error!("{:#}", err);
        std::process::exit(1);
    }
}
