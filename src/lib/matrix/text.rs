//! Dense delimited text matrices (`.csv`, `.tsv`, `.txt`, optionally gzipped).
//!
//! Rows are observations. A header line is recognised when one of its value
//! fields is not numeric (for a one-field line, that field itself); data rows carry a leading observation name when
//! their first field is not numeric.

use crate::core::error::{ConvertError, Result};
use crate::core::io::open_buffered;
use crate::core::names;
use crate::matrix::ExpressionMatrix;
use anndata::data::ArrayData;
use log::debug;
use ndarray::Array2;
use std::io::BufRead;
use std::path::Path;

/// Field separator of a text matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
    Whitespace,
}

impl Delimiter {
    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Comma => line.split(',').map(str::trim).collect(),
            Delimiter::Tab => line.split('\t').map(str::trim).collect(),
            Delimiter::Whitespace => line.split_whitespace().collect(),
        }
    }
}

#[inline]
fn is_numeric(field: &str) -> bool {
    field.parse::<f32>().is_ok()
}

/// Read a text matrix into a dense `f32` [`ExpressionMatrix`].
pub fn read_text<P: AsRef<Path>>(path: P, delimiter: Delimiter) -> Result<ExpressionMatrix> {
    let path = path.as_ref();
    let reader = open_buffered(path)?;

    let mut header: Option<Vec<String>> = None;
    let mut has_row_names: Option<bool> = None;
    let mut n_values: Option<usize> = None;
    let mut row_names = Vec::new();
    let mut values: Vec<f32> = Vec::new();
    let mut first_row: Option<u64> = None;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx as u64 + 1;
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields = delimiter.split(trimmed);

        if header.is_none() && has_row_names.is_none() {
            // Skip the row-label column when deciding whether this is a header,
            // unless the line has no other column.
            let label_columns = if fields.len() > 1 { 1 } else { 0 };
            if fields.iter().skip(label_columns).any(|f| !is_numeric(f)) {
                header = Some(fields.iter().map(|f| f.to_string()).collect());
                continue;
            }
        }

        first_row.get_or_insert(line_no);
        let row_names_present = *has_row_names.get_or_insert_with(|| !is_numeric(fields[0]));
        let row_values = if row_names_present {
            &fields[1..]
        } else {
            &fields[..]
        };

        let expected = *n_values.get_or_insert(row_values.len());
        if row_values.len() != expected {
            return Err(ConvertError::parse(
                path,
                line_no,
                format!("expected {} values, found {}", expected, row_values.len()),
            ));
        }

        if row_names_present {
            row_names.push(fields[0].to_string());
        }
        for (col, field) in row_values.iter().enumerate() {
            let value = field.parse::<f32>().map_err(|_| {
                ConvertError::parse(
                    path,
                    line_no,
                    format!("value '{}' in column {} is not numeric", field, col + 1),
                )
            })?;
            values.push(value);
        }
    }

    let n_vars = n_values.unwrap_or_else(|| {
        header
            .as_ref()
            .map(|h| h.len().saturating_sub(1))
            .unwrap_or(0)
    });
    if n_vars == 0 && !row_names.is_empty() {
        return Err(ConvertError::parse(
            path,
            first_row.unwrap_or(1),
            "rows carry an observation name but no values",
        ));
    }
    let n_obs = if n_vars == 0 { 0 } else { values.len() / n_vars };

    let obs_names = if has_row_names == Some(true) {
        row_names
    } else {
        names::positional(n_obs)
    };

    let var_names = match header {
        Some(mut header) if header.len() == n_vars + 1 => header.split_off(1),
        Some(header) if header.len() == n_vars => header,
        Some(header) => {
            return Err(ConvertError::parse(
                path,
                1,
                format!(
                    "header has {} fields but rows carry {} values",
                    header.len(),
                    n_vars
                ),
            ))
        }
        None => names::positional(n_vars),
    };

    debug!(
        "Parsed text matrix {}: {} rows, {} columns",
        path.display(),
        n_obs,
        n_vars
    );

    let x = Array2::from_shape_vec((n_obs, n_vars), values)
        .map_err(|e| ConvertError::InvalidInput(format!("Failed to shape matrix: {}", e)))?;
    ExpressionMatrix::new(ArrayData::from(x.into_dyn()), obs_names, var_names)
}
