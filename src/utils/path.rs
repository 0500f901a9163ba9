use std::env;
use std::path::{Path, PathBuf};

const HOME_ENV_VAR: &str = "HOME";

/// Expands a leading `~` to the current user home directory.
///
/// Paths not starting with `~` and paths with no resolvable home are returned untouched.
pub fn expand_home(path: &str) -> PathBuf {
    expand_home_with(path, env::var_os(HOME_ENV_VAR).map(PathBuf::from))
}

fn expand_home_with(path: &str, home: Option<PathBuf>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(path);
    };
    match path.strip_prefix('~') {
        Some("") => home,
        Some(rest) if rest.starts_with('/') => home.join(rest.trim_start_matches('/')),
        _ => PathBuf::from(path),
    }
}

/// Returns the user home directory, if known.
pub fn home_dir() -> Option<PathBuf> {
    env::var_os(HOME_ENV_VAR)
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
}

/// Returns `path` relative to `base`, if `path` lives inside it.
pub fn relative_to<'a>(path: &'a Path, base: &Path) -> Option<&'a Path> {
    path.strip_prefix(base).ok()
}
