use make_h5ad_lib::core::error::Result;
use make_h5ad_lib::core::fs::require_file;
use std::path::PathBuf;
use structopt::clap::AppSettings;
use structopt::StructOpt;

/// Arguments for the conversion. All three flags are required and must be
/// spelled out in full.
#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "make-h5ad",
    about = "Join a gene expression matrix with spatial barcode coordinates into an .h5ad file",
    global_settings = &[AppSettings::DisableHelpFlags, AppSettings::DisableVersion]
)]
pub struct ConvertArgs {
    /// Digital gene expression file (.h5ad, 10x .h5, .loom, .mtx, .csv, .tsv or .txt; text and .mtx may be gzipped).
    #[structopt(long, parse(from_os_str))]
    pub counts: PathBuf,

    /// Headerless barcode,in_tissue,x_pos,y_pos file.
    #[structopt(long = "spatial_coordinates", parse(from_os_str))]
    pub spatial_coordinates: PathBuf,

    /// Output path for the `.h5ad` file.
    #[structopt(long, parse(from_os_str))]
    pub output: PathBuf,
}

impl ConvertArgs {
    /// Check that both inputs exist before any parsing starts.
    pub fn validate(&self) -> Result<()> {
        require_file(&self.counts)?;
        require_file(&self.spatial_coordinates)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use structopt::clap::ErrorKind;

    #[test]
    fn parses_all_three_flags() {
        let args = ConvertArgs::from_iter_safe(&[
            "make-h5ad",
            "--counts",
            "dge.txt.gz",
            "--spatial_coordinates",
            "barcodes.csv",
            "--output",
            "out.h5ad",
        ])
        .unwrap();

        assert_eq!(args.counts, PathBuf::from("dge.txt.gz"));
        assert_eq!(args.spatial_coordinates, PathBuf::from("barcodes.csv"));
        assert_eq!(args.output, PathBuf::from("out.h5ad"));
    }

    #[test]
    fn missing_output_is_a_usage_error() {
        let err = ConvertArgs::from_iter_safe(&[
            "make-h5ad",
            "--counts",
            "dge.txt",
            "--spatial_coordinates",
            "barcodes.csv",
        ])
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn abbreviated_flag_is_rejected() {
        let err = ConvertArgs::from_iter_safe(&[
            "make-h5ad",
            "--counts",
            "dge.txt",
            "--spatial_coordinates",
            "barcodes.csv",
            "--out",
            "out.h5ad",
        ])
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownArgument);
    }

    #[test]
    fn kebab_case_spelling_is_rejected() {
        let err = ConvertArgs::from_iter_safe(&[
            "make-h5ad",
            "--counts",
            "dge.txt",
            "--spatial-coordinates",
            "barcodes.csv",
            "--output",
            "out.h5ad",
        ])
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownArgument);
    }

    #[test]
    fn help_flag_is_not_accepted() {
        assert!(ConvertArgs::from_iter_safe(&["make-h5ad", "--help"]).is_err());
    }

    #[test]
    fn validate_reports_missing_counts() {
        let args = ConvertArgs {
            counts: PathBuf::from("/no/such/dge.txt"),
            spatial_coordinates: PathBuf::from("/no/such/barcodes.csv"),
            output: PathBuf::from("out.h5ad"),
        };
        assert!(args.validate().is_err());
    }
}
