//! Error types for the make-h5ad library

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("AnnData error: {0}")]
    AnnData(#[from] anyhow::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Sparse matrix error: {0}")]
    SparseMatrix(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Unsupported expression matrix format '{extension}' for {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Parse error in {} at line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("Duplicate barcode '{barcode}' in {} (lines {first_line} and {line})", path.display())]
    DuplicateBarcode {
        path: PathBuf,
        barcode: String,
        first_line: u64,
        line: u64,
    },

    #[error("Column '{0}' already exists in the observation table")]
    ColumnConflict(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    pub(crate) fn parse(path: impl Into<PathBuf>, line: u64, message: impl Into<String>) -> Self {
        ConvertError::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

impl From<nalgebra_sparse::SparseFormatError> for ConvertError {
    fn from(err: nalgebra_sparse::SparseFormatError) -> Self {
        ConvertError::SparseMatrix(format!("Sparse format error: {:?}", err))
    }
}

/// Returns `true` if any error in the chain is a broken pipe.
pub fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|io_err| io_err.kind() == io::ErrorKind::BrokenPipe)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn broken_pipe_is_found_through_context() {
        let inner: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        let err = inner.context("writing summary").unwrap_err();
        assert!(is_broken_pipe(&err));
    }

    #[test]
    fn broken_pipe_is_found_inside_convert_error() {
        let err = anyhow::Error::new(ConvertError::Io(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "closed",
        )));
        assert!(is_broken_pipe(&err));
    }

    #[test]
    fn other_errors_are_not_broken_pipes() {
        let err = anyhow::Error::new(ConvertError::InvalidInput("bad".to_string()));
        assert!(!is_broken_pipe(&err));
    }

    #[test]
    fn parse_error_names_location() {
        let err = ConvertError::parse("spots.csv", 3, "expected 4 fields, found 3");
        assert_eq!(
            err.to_string(),
            "Parse error in spots.csv at line 3: expected 4 fields, found 3"
        );
    }
}
