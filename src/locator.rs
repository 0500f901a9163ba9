//! Discovery of runner directories below a root directory.
use crate::defaults::{RUNNER_MARKER_FILE, RUNNER_WORK_DIR};
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("runners root directory `{path}` cannot be read: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A directory holding exactly one runner installation, identified by its [RUNNER_MARKER_FILE].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunnerDir(PathBuf);

impl RunnerDir {
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Scratch directory the runner writes its jobs into.
    pub fn work_dir(&self) -> PathBuf {
        self.0.join(RUNNER_WORK_DIR)
    }

    pub fn entrypoint(&self) -> PathBuf {
        self.0.join(RUNNER_MARKER_FILE)
    }

    /// Last path component, used to name the thread driving this runner.
    pub fn name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.0.to_string_lossy().to_string())
    }
}

impl From<PathBuf> for RunnerDir {
    fn from(value: PathBuf) -> Self {
        Self(value)
    }
}

impl AsRef<Path> for RunnerDir {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for RunnerDir {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Walks the tree under `root` returning every directory directly containing the runner marker.
///
/// The walk never descends into a matched directory, so a runner payload shipping its own copy of
/// the marker is not reported. Results are ordered by file name at every level. A readable root
/// without runners yields an empty list; unreadable subdirectories are skipped.
pub fn search_runner_dirs(root: &Path) -> Result<Vec<RunnerDir>, DiscoveryError> {
    fs::read_dir(root).map_err(|source| DiscoveryError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut runner_dirs = Vec::new();
    let mut entries = WalkDir::new(root).sort_by_file_name().into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping path while searching runners: {err}");
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        if entry.path().join(RUNNER_MARKER_FILE).is_file() {
            debug!(runner = %entry.path().display(), "Runner directory found");
            runner_dirs.push(RunnerDir::from(entry.into_path()));
            entries.skip_current_dir();
        }
    }

    Ok(runner_dirs)
}
