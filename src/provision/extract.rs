use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::Path;
use tar::Archive;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
#[error("extract error: {0}")]
pub struct ExtractError(pub String);

/// Unpacks the runner tar.gz at `archive_path` into `destination`, creating it when missing.
///
/// Entries trying to escape `destination` (absolute or `..` paths) are skipped by `tar`. File modes
/// are kept so the runner scripts stay executable.
#[instrument(skip_all, fields(archive_path = %archive_path.display()), name = "extracting_runner")]
pub fn extract_tar_gz(archive_path: &Path, destination: &Path) -> Result<(), ExtractError> {
    debug!("Extracting tar.gz archive to '{}'", destination.display());

    let tar_gz = File::open(archive_path)
        .map_err(|e| ExtractError(format!("opening tar.gz file: {e}")))?;
    fs::create_dir_all(destination)
        .map_err(|e| ExtractError(format!("creating destination: {e}")))?;

    let mut archive = Archive::new(GzDecoder::new(tar_gz));
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);
    archive
        .unpack(destination)
        .map_err(|e| ExtractError(format!("extracting tar.gz file: {e}")))
}
