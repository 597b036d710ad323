//! Repository root discovery.
//!
//! A directory is a host tree when it contains every marker entry declared by
//! the manifest. An explicit path is validated as-is; without one the search
//! starts at the current directory and probes a few ancestors.

use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::manifest::RepoMarkers;

/// Ancestors probed above the starting directory when no path is given.
pub const MAX_ANCESTOR_PROBES: usize = 3;

/// Resolve the host root.
///
/// With `start` the directory itself must validate. Without it, the current
/// directory and up to [`MAX_ANCESTOR_PROBES`] ancestors are tried in order.
pub fn locate(start: Option<&Path>, markers: &RepoMarkers) -> Result<PathBuf> {
    match start {
        Some(path) => {
            let candidate = path.canonicalize().map_err(|_| Error::InvalidRepository {
                path: path.to_path_buf(),
                missing: vec!["(directory does not exist)".to_string()],
            })?;
            let missing = missing_markers(&candidate, markers);
            if candidate.is_dir() && missing.is_empty() {
                Ok(candidate)
            } else {
                Err(Error::InvalidRepository {
                    path: candidate,
                    missing,
                })
            }
        }
        None => {
            let cwd = std::env::current_dir()?;
            locate_from(&cwd, markers)
        }
    }
}

/// Search `start` and its nearest ancestors for a host root.
pub fn locate_from(start: &Path, markers: &RepoMarkers) -> Result<PathBuf> {
    let mut first_missing = None;
    for candidate in start.ancestors().take(MAX_ANCESTOR_PROBES + 1) {
        let missing = missing_markers(candidate, markers);
        debug!(
            "probing {} for host tree: {} marker(s) missing",
            candidate.display(),
            missing.len()
        );
        if missing.is_empty() {
            return Ok(candidate.to_path_buf());
        }
        first_missing.get_or_insert(missing);
    }

    Err(Error::InvalidRepository {
        path: start.to_path_buf(),
        missing: first_missing.unwrap_or_default(),
    })
}

/// Marker entries absent from `dir`, in declaration order.
pub fn missing_markers(dir: &Path, markers: &RepoMarkers) -> Vec<String> {
    let files = markers
        .files
        .iter()
        .filter(|file| !dir.join(file).is_file());
    let dirs = markers.dirs.iter().filter(|sub| !dir.join(sub).is_dir());
    files
        .chain(dirs)
        .map(|entry| entry.display().to_string())
        .collect()
}
