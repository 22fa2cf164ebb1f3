use anyhow::{Context, Result};
use log::{error, info};

use make_h5ad_lib::matrix::load_matrix;
use make_h5ad_lib::pipeline::{join_spatial, write_h5ad, JoinSummary};
use make_h5ad_lib::spatial::SpatialTable;

use super::args::ConvertArgs;

pub fn run_convert(args: ConvertArgs) -> Result<()> {
    info!("Starting make-h5ad conversion");
    info!("Arguments: {:?}", args);

    args.validate()?;

    match execute_pipeline(&args) {
        Ok(summary) => {
            info!(
                "Conversion completed: {} observations matched, {} without coordinates",
                summary.matched, summary.unmatched
            );
            info!("Output written to: {}", args.output.display());
            Ok(())
        }
        Err(err) => {
            error!("Conversion failed: {:#}", err);
            Err(err)
        }
    }
}

/// Load both inputs, join them and write the container.
///
/// Both inputs are fully parsed before the output path is touched, so a
/// malformed input never leaves an output file behind.
pub fn execute_pipeline(args: &ConvertArgs) -> Result<JoinSummary> {
    let mut matrix = load_matrix(&args.counts).with_context(|| {
        format!(
            "Failed to read expression matrix {}",
            args.counts.display()
        )
    })?;

    info!(
        "Loading spatial coordinates: {}",
        args.spatial_coordinates.display()
    );
    let table = SpatialTable::from_path(&args.spatial_coordinates).with_context(|| {
        format!(
            "Failed to read spatial coordinates {}",
            args.spatial_coordinates.display()
        )
    })?;

    let summary = join_spatial(&mut matrix, &table).context("Failed to join spatial table")?;

    write_h5ad(&matrix, &args.output)
        .with_context(|| format!("Failed to write output file {}", args.output.display()))?;

    Ok(summary)
}
