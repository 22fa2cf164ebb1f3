//! Left join of observation metadata with the spatial table.
//!
//! Every observation keeps its row; the spatial columns are looked up by
//! observation name in the barcode index. Observations without a spot get
//! missing values: `NaN` for coordinates, an empty barcode, and `in_tissue`
//! promoted to float so it can hold `NaN`. `in_tissue` is also float when
//! any value in the file is fractional.

use crate::core::error::{ConvertError, Result};
use crate::matrix::ExpressionMatrix;
use crate::spatial::{SpatialRecord, SpatialTable, SPATIAL_COLUMNS};
use anndata::data::ArrayData;
use log::{info, warn};
use ndarray::Array2;
use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use rustc_hash::FxHashSet;

/// obsm key holding the `(x_pos, y_pos)` array.
pub const SPATIAL_KEY: &str = "spatial";

/// Counts reported after a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinSummary {
    /// Observations that found a spot.
    pub matched: usize,
    /// Observations left with missing values.
    pub unmatched: usize,
    /// Spots whose barcode is not an observation name.
    pub unused_records: usize,
}

/// Per-observation match against the barcode index, in row order.
pub fn match_observations<'a>(
    obs_names: &[String],
    table: &'a SpatialTable,
) -> Vec<Option<&'a SpatialRecord>> {
    obs_names.iter().map(|name| table.get(name)).collect()
}

/// Dense `(n_obs, 2)` coordinate array; unmatched rows are `NaN`.
pub fn spatial_coordinates(matches: &[Option<&SpatialRecord>]) -> Array2<f64> {
    Array2::from_shape_fn((matches.len(), 2), |(row, col)| match matches[row] {
        Some(record) if col == 0 => record.x_pos,
        Some(record) => record.y_pos,
        None => f64::NAN,
    })
}

fn spatial_columns(matches: &[Option<&SpatialRecord>]) -> Vec<Column> {
    let barcode: Vec<String> = matches
        .iter()
        .map(|m| m.map(|r| r.barcode.clone()).unwrap_or_default())
        .collect();
    let x_pos: Vec<f64> = matches
        .iter()
        .map(|m| m.map_or(f64::NAN, |r| r.x_pos))
        .collect();
    let y_pos: Vec<f64> = matches
        .iter()
        .map(|m| m.map_or(f64::NAN, |r| r.y_pos))
        .collect();

    let integral = matches.iter().all(|m| {
        m.is_some_and(|r| r.in_tissue.fract() == 0.0 && r.in_tissue.abs() < i64::MAX as f64)
    });
    let in_tissue = if integral {
        let values: Vec<i64> = matches
            .iter()
            .flatten()
            .map(|r| r.in_tissue as i64)
            .collect();
        Series::new(SPATIAL_COLUMNS[1].into(), values)
    } else {
        let values: Vec<f64> = matches
            .iter()
            .map(|m| m.map_or(f64::NAN, |r| r.in_tissue))
            .collect();
        Series::new(SPATIAL_COLUMNS[1].into(), values)
    };

    vec![
        Series::new(SPATIAL_COLUMNS[0].into(), barcode).into(),
        in_tissue.into(),
        Series::new(SPATIAL_COLUMNS[2].into(), x_pos).into(),
        Series::new(SPATIAL_COLUMNS[3].into(), y_pos).into(),
    ]
}

/// Append the spatial columns to `obs` and store the coordinates under
/// `obsm["spatial"]`.
///
/// Fails when `obs` already has a column named like one of the spatial
/// columns; the matrix is left untouched in that case.
pub fn join_spatial(matrix: &mut ExpressionMatrix, table: &SpatialTable) -> Result<JoinSummary> {
    let existing: FxHashSet<String> = matrix
        .obs
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    if let Some(conflict) = SPATIAL_COLUMNS.iter().find(|c| existing.contains(**c)) {
        return Err(ConvertError::ColumnConflict(conflict.to_string()));
    }

    let matches = match_observations(&matrix.obs_names, table);
    let coordinates = spatial_coordinates(&matches);

    let mut columns: Vec<Column> = if matrix.obs.width() > 0 {
        matrix.obs.get_columns().to_vec()
    } else {
        Vec::with_capacity(SPATIAL_COLUMNS.len())
    };
    columns.extend(spatial_columns(&matches));
    let obs = DataFrame::new(columns)?;

    let matched = matches.iter().filter(|m| m.is_some()).count();
    let obs_set: FxHashSet<&str> = matrix.obs_names.iter().map(String::as_str).collect();
    let unused_records = table
        .records()
        .iter()
        .filter(|r| !obs_set.contains(r.barcode.as_str()))
        .count();
    let summary = JoinSummary {
        matched,
        unmatched: matches.len() - matched,
        unused_records,
    };

    matrix.obs = obs;
    if matrix.obsm.contains_key(SPATIAL_KEY) {
        warn!("Replacing existing obsm['{}'] array", SPATIAL_KEY);
    }
    matrix
        .obsm
        .insert(SPATIAL_KEY.to_string(), ArrayData::from(coordinates.into_dyn()));

    info!(
        "Spatial join: {} of {} observations matched, {} unmatched, {} spots unused",
        summary.matched,
        matrix.n_obs(),
        summary.unmatched,
        summary.unused_records
    );
    if summary.matched == 0 && matrix.n_obs() > 0 {
        warn!("No observation name matched a spatial barcode");
    }

    Ok(summary)
}
