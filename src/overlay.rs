//! # File Overlay Manager
//!
//! Copies overlay files into the host tree and removes them again.
//!
//! Install always rewrites every destination with the freshly normalized
//! source, so overlay updates propagate on every run. Before anything is
//! written all sources are checked; one missing source fails the whole step
//! with no writes.
//!
//! Uninstall only deletes a destination whose content is what this engine
//! would have installed from the current overlay. Anything else fails with
//! `ProvenanceMismatch` and is left in place: a destination that differs from
//! the normalized overlay source, and one whose overlay source is gone. The
//! run then exits non-zero, so a tree that could not be restored never reads
//! as a clean uninstall.

use std::fs;
use std::io;
use std::path::Path;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::host::HostTree;
use crate::manifest::FileMapping;
use crate::normalize::{normalize, Language, NormalizeOptions};
use crate::report::{Item, OperationOutcome, Status};

fn item(mapping: &FileMapping) -> Item {
    Item::File {
        destination: mapping.destination.clone(),
    }
}

/// Copy every mapping into the host tree.
pub fn install(
    host: &mut HostTree,
    overlay_root: &Path,
    mappings: &[FileMapping],
    options: &NormalizeOptions,
) -> Vec<OperationOutcome> {
    let missing: Vec<&FileMapping> = mappings
        .iter()
        .filter(|mapping| !overlay_root.join(&mapping.source).is_file())
        .collect();
    if !missing.is_empty() {
        return missing
            .into_iter()
            .map(|mapping| {
                let path = overlay_root.join(&mapping.source);
                warn!("overlay source {} is missing", path.display());
                OperationOutcome::new(item(mapping), Status::Failed(Error::MissingSource { path }))
            })
            .collect();
    }

    mappings
        .iter()
        .map(|mapping| {
            let status = match install_one(host, overlay_root, mapping, options) {
                Ok(()) => Status::Applied,
                Err(e) => Status::Failed(e),
            };
            OperationOutcome::new(item(mapping), status)
        })
        .collect()
}

fn install_one(
    host: &mut HostTree,
    overlay_root: &Path,
    mapping: &FileMapping,
    options: &NormalizeOptions,
) -> Result<()> {
    let content = rendered_source(overlay_root, mapping, options)?;
    host.write(&mapping.destination, &content)?;
    info!(
        "copied {} to {}",
        mapping.source.display(),
        mapping.destination.display()
    );
    Ok(())
}

/// Remove every mapping's destination, last mapping first.
pub fn uninstall(
    host: &mut HostTree,
    overlay_root: &Path,
    mappings: &[FileMapping],
    options: &NormalizeOptions,
) -> Vec<OperationOutcome> {
    mappings
        .iter()
        .rev()
        .map(|mapping| {
            let status = uninstall_one(host, overlay_root, mapping, options)
                .unwrap_or_else(Status::Failed);
            OperationOutcome::new(item(mapping), status)
        })
        .collect()
}

fn uninstall_one(
    host: &mut HostTree,
    overlay_root: &Path,
    mapping: &FileMapping,
    options: &NormalizeOptions,
) -> Result<Status> {
    let Some(current) = host.read(&mapping.destination)? else {
        debug!("{} already absent", mapping.destination.display());
        return Ok(Status::AlreadyApplied);
    };

    let mismatch = |reason: &str| -> Result<Status> {
        warn!(
            "{}: {reason}; leaving it in place",
            mapping.destination.display()
        );
        Err(Error::ProvenanceMismatch {
            path: mapping.destination.clone(),
            reason: reason.to_string(),
        })
    };
    match rendered_source(overlay_root, mapping, options) {
        Ok(expected) if expected != current => {
            return mismatch("content differs from the overlay source");
        }
        Ok(_) => {}
        Err(Error::MissingSource { .. }) => {
            return mismatch("overlay source is missing, cannot confirm the file was installed");
        }
        Err(e) => return Err(e),
    }

    host.remove(&mapping.destination)?;
    info!("removed {}", mapping.destination.display());
    Ok(Status::Applied)
}

/// The bytes a mapping installs: the normalized source text, or the raw bytes
/// when the source is not UTF-8.
pub fn rendered_source(
    overlay_root: &Path,
    mapping: &FileMapping,
    options: &NormalizeOptions,
) -> Result<Vec<u8>> {
    let path = overlay_root.join(&mapping.source);
    let bytes = fs::read(&path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            Error::MissingSource { path: path.clone() }
        } else {
            Error::Read {
                path: path.clone(),
                source,
            }
        }
    })?;

    match String::from_utf8(bytes) {
        Ok(text) => {
            let language = Language::from_path(&mapping.destination);
            Ok(normalize(&text, language, options).into_bytes())
        }
        Err(e) => {
            debug!("{} is not UTF-8; copying verbatim", path.display());
            Ok(e.into_bytes())
        }
    }
}
