//! Install/uninstall orchestration.
//!
//! Install copies overlay files first and patches host files second, so a
//! patch never points at a file that is not there yet. Uninstall runs the
//! exact reverse: patches come out first, then the overlay files.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::host::HostTree;
use crate::manifest::Manifest;
use crate::report::{InstallReport, Mode};
use crate::{overlay, patch};

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Compute outcomes without writing anything.
    pub dry_run: bool,
    /// Overlay tree location. Defaults to the manifest's overlay path
    /// resolved against the host root.
    pub overlay: Option<PathBuf>,
}

impl RunOptions {
    pub fn overlay_root(&self, root: &Path, manifest: &Manifest) -> PathBuf {
        match &self.overlay {
            Some(path) => path.clone(),
            None => root.join(&manifest.overlay),
        }
    }
}

/// Run one install or uninstall against the host tree at `root`.
///
/// Returns `Err` only for structural failures that make every item
/// meaningless (the overlay tree is missing on install). Everything else is
/// recorded per item in the report.
pub fn run(root: &Path, manifest: &Manifest, mode: Mode, options: &RunOptions) -> Result<InstallReport> {
    let overlay_root = options.overlay_root(root, manifest);
    let mut host = HostTree::new(root, options.dry_run);
    let mut report = InstallReport::new(mode, options.dry_run);

    debug!(
        "{} into {} from overlay {}",
        mode,
        root.display(),
        overlay_root.display()
    );

    match mode {
        Mode::Install => {
            if !overlay_root.is_dir() {
                return Err(Error::OverlayNotFound { path: overlay_root });
            }

            let copied = overlay::install(&mut host, &overlay_root, &manifest.files, &manifest.normalize);
            let copy_failed = copied.iter().any(|o| o.status.is_failed());
            report.outcomes.extend(copied);
            if copy_failed {
                warn!("overlay copy failed; skipping patches");
                return Ok(report);
            }

            report.outcomes.extend(patch::apply(&mut host, &manifest.patches));
        }
        Mode::Uninstall => {
            report.outcomes.extend(patch::remove(&mut host, &manifest.patches));
            report.outcomes.extend(overlay::uninstall(
                &mut host,
                &overlay_root,
                &manifest.files,
                &manifest.normalize,
            ));
        }
    }

    Ok(report)
}
