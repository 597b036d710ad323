//! # Host Tree Access
//!
//! Every read and write the engine performs inside the host tree goes through
//! [`HostTree`]. Paths handed to it are relative to the host root.
//!
//! Real writes are atomic: content goes to a temporary file in the destination
//! directory, is synced, and is then renamed over the destination, so a file
//! is always either its old or its new content. The temporary file is removed
//! on every failure path.
//!
//! In dry-run mode nothing touches the disk. Writes and deletions are staged in
//! memory instead, and later reads observe them, so a preview computes the same
//! outcomes a real run would (including rules that stack on one file).

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Read/write gateway for one host tree.
#[derive(Debug)]
pub struct HostTree {
    root: PathBuf,
    dry_run: bool,
    /// Dry-run changes: `Some(content)` for a write, `None` for a deletion.
    staged: BTreeMap<PathBuf, Option<Vec<u8>>>,
}

impl HostTree {
    pub fn new(root: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            root: root.into(),
            dry_run,
            staged: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Absolute path of a host-relative path.
    pub fn path(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Whether a regular file exists at `relative`.
    pub fn exists(&self, relative: &Path) -> bool {
        match self.staged.get(relative) {
            Some(staged) => staged.is_some(),
            None => self.path(relative).is_file(),
        }
    }

    /// Read a file, or `None` if it does not exist.
    pub fn read(&self, relative: &Path) -> Result<Option<Vec<u8>>> {
        if let Some(staged) = self.staged.get(relative) {
            return Ok(staged.clone());
        }
        let full_path = self.path(relative);
        match fs::read(&full_path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::Read {
                path: full_path,
                source,
            }),
        }
    }

    /// Read a UTF-8 text file, or `None` if it does not exist.
    pub fn read_text(&self, relative: &Path) -> Result<Option<String>> {
        match self.read(relative)? {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| Error::Read {
                path: self.path(relative),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            }),
        }
    }

    /// Replace the content of `relative`, creating parent directories.
    pub fn write(&mut self, relative: &Path, content: &[u8]) -> Result<()> {
        if self.dry_run {
            debug!("dry run: staging write of {}", relative.display());
            self.staged
                .insert(relative.to_path_buf(), Some(content.to_vec()));
            return Ok(());
        }
        write_atomic(&self.path(relative), content)
    }

    /// Delete `relative`. Returns false if there was nothing to delete.
    pub fn remove(&mut self, relative: &Path) -> Result<bool> {
        if !self.exists(relative) {
            return Ok(false);
        }
        if self.dry_run {
            debug!("dry run: staging removal of {}", relative.display());
            self.staged.insert(relative.to_path_buf(), None);
            return Ok(true);
        }
        let full_path = self.path(relative);
        fs::remove_file(&full_path).map_err(|source| Error::Write {
            path: full_path,
            source,
        })?;
        Ok(true)
    }
}

/// Write `content` to `path` atomically.
///
/// Existing permissions are carried over to the new file. New files get the
/// usual `0644` mode on Unix.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let write_err = |source: io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(write_err)?;

    let mut temp = NamedTempFile::new_in(parent).map_err(write_err)?;
    temp.write_all(content).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;

    match fs::metadata(path) {
        Ok(existing) => {
            fs::set_permissions(temp.path(), existing.permissions()).map_err(write_err)?;
        }
        Err(_) => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o644))
                    .map_err(write_err)?;
            }
        }
    }

    temp.persist(path).map_err(|e| write_err(e.error))?;
    debug!("wrote {} ({} bytes)", path.display(), content.len());
    Ok(())
}
