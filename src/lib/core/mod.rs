pub mod error;
pub mod fs;
pub mod io;
pub mod names;
pub mod sparse;

pub mod prelude {
    pub use super::error::{is_broken_pipe, ConvertError, Result};
    pub use super::fs::{remove_existing, require_file};
    pub use super::io::{content_extension, get_reader, is_gzipped, open_buffered};
    pub use super::names::make_unique;
    pub use super::sparse::SparseOps;
}
