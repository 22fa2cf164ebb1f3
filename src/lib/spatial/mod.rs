//! Spatial barcode table
//!
//! The coordinate file is a headerless, comma-delimited list of spots:
//!
//! ```text
//! <barcode>,<in_tissue>,<x_pos>,<y_pos>
//! ```
//!
//! Columns are named positionally (see [`SPATIAL_COLUMNS`]) and the table is
//! indexed by barcode for the join against observation names. A barcode may
//! appear only once; a repeat is rejected rather than fanning out rows.

use crate::core::error::{ConvertError, Result};
use crate::core::io::get_reader;
use log::info;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Column names assigned to the four positional fields.
pub const SPATIAL_COLUMNS: [&str; 4] = ["barcode", "in_tissue", "x_pos", "y_pos"];

/// One spot from the coordinate file.
///
/// `in_tissue` is kept as read; the join decides whether the column can be
/// stored as integers.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialRecord {
    pub barcode: String,
    pub in_tissue: f64,
    pub x_pos: f64,
    pub y_pos: f64,
}

/// Spatial records in file order with a barcode index.
#[derive(Debug, Clone, Default)]
pub struct SpatialTable {
    records: Vec<SpatialRecord>,
    index: FxHashMap<String, usize>,
}

impl SpatialTable {
    /// Load a coordinate file (plain or `.gz`).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = get_reader(path, b',')?;

        let mut table = SpatialTable::default();
        let mut lines: Vec<u64> = Vec::new();

        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let parsed = parse_record(path, line, &record)?;

            if let Some(&existing) = table.index.get(&parsed.barcode) {
                return Err(ConvertError::DuplicateBarcode {
                    path: path.to_path_buf(),
                    barcode: parsed.barcode,
                    first_line: lines[existing],
                    line,
                });
            }

            lines.push(line);
            table.push(parsed);
        }

        info!(
            "Loaded {} spatial barcodes from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Build a table from records already in memory, rejecting repeated barcodes.
    pub fn from_records(records: Vec<SpatialRecord>) -> Result<Self> {
        let mut table = SpatialTable {
            records: Vec::with_capacity(records.len()),
            index: FxHashMap::with_capacity_and_hasher(records.len(), Default::default()),
        };
        for record in records {
            if table.index.contains_key(&record.barcode) {
                return Err(ConvertError::InvalidInput(format!(
                    "Duplicate barcode '{}'",
                    record.barcode
                )));
            }
            table.push(record);
        }
        Ok(table)
    }

    fn push(&mut self, record: SpatialRecord) {
        self.index.insert(record.barcode.clone(), self.records.len());
        self.records.push(record);
    }

    /// Look up the record for a barcode.
    #[inline]
    pub fn get(&self, barcode: &str) -> Option<&SpatialRecord> {
        self.index.get(barcode).map(|&row| &self.records[row])
    }

    /// Row position of a barcode in file order.
    #[inline]
    pub fn position_of(&self, barcode: &str) -> Option<usize> {
        self.index.get(barcode).copied()
    }

    /// Records in file order.
    pub fn records(&self) -> &[SpatialRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_record(path: &Path, line: u64, record: &csv::StringRecord) -> Result<SpatialRecord> {
    if record.len() != SPATIAL_COLUMNS.len() {
        return Err(ConvertError::parse(
            path,
            line,
            format!(
                "expected {} fields ({}), found {}",
                SPATIAL_COLUMNS.len(),
                SPATIAL_COLUMNS.join(", "),
                record.len()
            ),
        ));
    }

    let field = |idx: usize| record.get(idx).unwrap_or_default();
    let invalid = |idx: usize, kind: &str| {
        ConvertError::parse(
            path,
            line,
            format!(
                "{} value '{}' is not {}",
                SPATIAL_COLUMNS[idx],
                field(idx),
                kind
            ),
        )
    };

    Ok(SpatialRecord {
        barcode: field(0).to_string(),
        in_tissue: field(1).parse::<f64>().map_err(|_| invalid(1, "a number"))?,
        x_pos: field(2).parse::<f64>().map_err(|_| invalid(2, "a number"))?,
        y_pos: field(3).parse::<f64>().map_err(|_| invalid(3, "a number"))?,
    })
}
