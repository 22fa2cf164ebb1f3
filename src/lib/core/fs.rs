use crate::core::error::{ConvertError, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Require an input path to exist before any parsing starts.
pub fn require_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        Ok(())
    } else {
        Err(ConvertError::FileNotFound(path.to_path_buf()))
    }
}

/// Remove a previous output file so the writer starts from an empty container.
pub fn remove_existing<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.is_file() {
        debug!("Removing existing output file {}", path.display());
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_existing_is_noop_for_missing_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        remove_existing(dir.path().join("absent.h5ad"))
    }

    #[test]
    fn remove_existing_deletes_previous_output() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.h5ad");
        fs::write(&path, b"stale")?;
        remove_existing(&path)?;
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn require_file_reports_missing_path() {
        let err = require_file("/no/such/counts.h5ad").unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound(_)));
    }
}
