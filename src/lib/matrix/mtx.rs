//! Matrix Market coordinate files.

use crate::core::error::{ConvertError, Result};
use crate::core::io::open_buffered;
use crate::core::names;
use crate::core::sparse::SparseOps;
use crate::matrix::ExpressionMatrix;
use anndata::data::ArrayData;
use log::info;
use std::io::BufRead;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Real,
    Integer,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symmetry {
    General,
    Symmetric,
}

fn parse_banner(path: &Path, banner: &str) -> Result<(Field, Symmetry)> {
    let tokens: Vec<String> = banner
        .split_whitespace()
        .map(|t| t.to_ascii_lowercase())
        .collect();
    if tokens.len() < 5 || tokens[0] != "%%matrixmarket" || tokens[1] != "matrix" {
        return Err(ConvertError::parse(path, 1, "missing %%MatrixMarket matrix banner"));
    }
    if tokens[2] != "coordinate" {
        return Err(ConvertError::parse(
            path,
            1,
            format!("unsupported Matrix Market layout '{}'", tokens[2]),
        ));
    }

    let field = match tokens[3].as_str() {
        "real" | "double" => Field::Real,
        "integer" => Field::Integer,
        "pattern" => Field::Pattern,
        other => {
            return Err(ConvertError::parse(
                path,
                1,
                format!("unsupported Matrix Market field '{}'", other),
            ))
        }
    };
    let symmetry = match tokens[4].as_str() {
        "general" => Symmetry::General,
        "symmetric" => Symmetry::Symmetric,
        other => {
            return Err(ConvertError::parse(
                path,
                1,
                format!("unsupported Matrix Market symmetry '{}'", other),
            ))
        }
    };
    Ok((field, symmetry))
}

fn parse_usize(path: &Path, line: u64, token: Option<&str>, what: &str) -> Result<usize> {
    token
        .and_then(|t| t.parse::<usize>().ok())
        .ok_or_else(|| ConvertError::parse(path, line, format!("invalid {}", what)))
}

/// Read a Matrix Market coordinate file; rows are observations.
///
/// The format carries no labels, so observations and features are named by
/// their zero-based position.
pub fn read_mtx<P: AsRef<Path>>(path: P) -> Result<ExpressionMatrix> {
    let path = path.as_ref();
    let mut lines = open_buffered(path)?.lines();

    let banner = lines
        .next()
        .transpose()?
        .ok_or_else(|| ConvertError::parse(path, 1, "empty file"))?;
    let (field, symmetry) = parse_banner(path, &banner)?;

    let mut line_no = 1u64;
    let mut size: Option<(usize, usize, usize)> = None;
    let mut triplets: Vec<(usize, usize, f32)> = Vec::new();

    for line in lines {
        let line = line?;
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        let mut tokens = trimmed.split_whitespace();

        let Some((nrows, ncols, nnz)) = size else {
            let nrows = parse_usize(path, line_no, tokens.next(), "row count")?;
            let ncols = parse_usize(path, line_no, tokens.next(), "column count")?;
            let nnz = parse_usize(path, line_no, tokens.next(), "entry count")?;
            triplets.reserve(nnz);
            size = Some((nrows, ncols, nnz));
            continue;
        };

        if triplets.len() >= nnz && symmetry == Symmetry::General {
            return Err(ConvertError::parse(
                path,
                line_no,
                format!("more entries than the declared {}", nnz),
            ));
        }

        let row = parse_usize(path, line_no, tokens.next(), "row index")?;
        let col = parse_usize(path, line_no, tokens.next(), "column index")?;
        if row == 0 || col == 0 || row > nrows || col > ncols {
            return Err(ConvertError::parse(
                path,
                line_no,
                format!("entry ({}, {}) outside {}×{}", row, col, nrows, ncols),
            ));
        }

        let value = match field {
            Field::Pattern => 1.0,
            Field::Real | Field::Integer => tokens
                .next()
                .and_then(|t| t.parse::<f32>().ok())
                .ok_or_else(|| ConvertError::parse(path, line_no, "missing or invalid value"))?,
        };

        triplets.push((row - 1, col - 1, value));
        if symmetry == Symmetry::Symmetric && row != col {
            triplets.push((col - 1, row - 1, value));
        }
    }

    let (nrows, ncols, _) =
        size.ok_or_else(|| ConvertError::parse(path, line_no, "missing size line"))?;

    let matrix = SparseOps::from_triplets(nrows, ncols, triplets)?;
    let (density, nnz, _) = SparseOps::density_stats(&matrix);
    info!(
        "Read Matrix Market {}×{} with {} non-zeros (density {:.4})",
        nrows, ncols, nnz, density
    );

    ExpressionMatrix::new(
        ArrayData::from(matrix),
        names::positional(nrows),
        names::positional(ncols),
    )
}
