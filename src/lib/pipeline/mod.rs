//! Joiner/writer stage of the conversion
//!
//! - [`join`]: left join of observation metadata with the spatial table and
//!   construction of `obsm["spatial"]`
//! - [`writer`]: serialization of the joined matrix to `.h5ad`

pub mod join;
pub mod writer;

pub use join::{join_spatial, JoinSummary, SPATIAL_KEY};
pub use writer::write_h5ad;
