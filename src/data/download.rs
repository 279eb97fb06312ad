//! Fetch and unpack `.tar.gz` dataset archives

use crate::progress::{ProgressBar, ProgressReader};
use crate::{Error, Result};
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Download a gzipped tarball and unpack it into `dest`
///
/// The archive is streamed: bytes are decompressed and written as they arrive,
/// nothing is buffered on disk besides the extracted files.
pub fn download_and_extract(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    fs::create_dir_all(dest)?;

    let response = reqwest::blocking::get(url)
        .map_err(|e| Error::Download(format!("failed to fetch {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::Download(format!(
            "failed to download {url}: HTTP {}",
            response.status()
        )));
    }

    let total = response.content_length().unwrap_or(0);
    let bar = ProgressBar::new(total, "Downloading").with_enabled(show_progress);
    let mut reader = ProgressReader::new(response, bar);

    unpack_tar_gz(&mut reader, dest)?;
    reader.finish();
    Ok(())
}

/// Unpack a gzipped tar stream into `dest`
pub(crate) fn unpack_tar_gz<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    archive
        .unpack(dest)
        .map_err(|e| Error::Download(format!("failed to unpack archive: {e}")))
}
