use crate::core::error::{ConvertError, Result};
use flate2::read::MultiGzDecoder;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const READ_BUFFER: usize = 256 * 1024;

/// Detect whether a path uses a gzip extension.
pub fn is_gzipped<P: AsRef<Path>>(path: P) -> bool {
    matches!(
        path.as_ref().extension().unwrap_or_else(|| OsStr::new("")),
        ext if ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("gzip")
    )
}

/// Lowercased extension of a path after stripping a trailing `.gz`.
///
/// `counts.mtx.gz` yields `mtx`, `counts.TSV` yields `tsv`.
pub fn content_extension<P: AsRef<Path>>(path: P) -> Option<String> {
    let path = path.as_ref();
    let inner = if is_gzipped(path) {
        Path::new(path.file_stem()?)
    } else {
        path
    };
    inner
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Open a file for reading, transparently decompressing gzip input.
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn Read>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => ConvertError::FileNotFound(path.to_path_buf()),
        _ => ConvertError::Io(err),
    })?;

    if is_gzipped(path) {
        Ok(Box::new(MultiGzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Buffered line reader over a plain or gzip-compressed file.
pub fn open_buffered<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let reader = open_reader(path)?;
    Ok(Box::new(BufReader::with_capacity(READ_BUFFER, reader)))
}

/// Build a headerless CSV reader for a plain or gzip-compressed file.
///
/// Records may have any length; callers check field counts themselves so
/// the error can name the offending line.
pub fn get_reader<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<csv::Reader<Box<dyn BufRead>>> {
    let reader = open_buffered(path)?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader))
}
