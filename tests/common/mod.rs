//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let host = HostFixture::klipper();
//!     host.command().assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::host_files;
    #[allow(unused_imports)]
    pub use super::snapshot;
    #[cfg(unix)]
    #[allow(unused_imports)]
    pub use super::{make_read_only, make_writable};
    pub use super::HostFixture;
}

/// File contents of a small Klipper-like host checkout.
#[allow(dead_code)]
pub mod host_files {
    pub const TOP_MAKEFILE: &str = "# Klipper build system\nall: out/klipper.elf\n";

    pub const README: &str = "Welcome to the Klipper project!\n";

    pub const SRC_MAKEFILE: &str = "\
# Main code build rules

src-y += sched.c command.c basecmd.c debugcmds.c
src-$(CONFIG_WANT_SENSOR_ANGLE) += sensor_angle.c
src-$(CONFIG_WANT_LDC1612) += sensor_ldc1612.c
src-$(CONFIG_WANT_HX71X) += sensor_hx71x.c
";

    pub const BED_MESH: &str = r#"class BedMeshCalibrate:
    def __init__(self, config, bedmesh):
        self.printer = config.get_printer()

    def probe_finalize(self, probe_name):
        if probe_name.startswith("probe_eddy_current"):
            return self._scan_mode()
        return self._point_mode()
"#;

    pub const PROBE_EDDY_NG: &str = "\
# eddy-ng probe support
class ProbeEddyNG:
    def __init__(self, config):
        self.printer = config.get_printer()


def load_config_prefix(config):
    return ProbeEddyNG(config)
";

    pub const LDC1612_NG: &str = "\
# LDC1612 sensor driver for eddy-ng
LDC1612_ADDR = 0x2a


class LDC1612_ng:
    def __init__(self, config):
        self.name = config.get_name()
";

    pub const SENSOR_C: &str = "\
// Support for the LDC1612 in eddy-ng mode
#include \"basecmd.h\"

void
command_config_ldc1612_ng(uint32_t *args)
{
}
";
}

/// A temporary Klipper-like host tree with the eddy-ng overlay checked out
/// inside it.
pub struct HostFixture {
    temp_dir: assert_fs::TempDir,
}

impl HostFixture {
    /// An empty directory that is not a host tree.
    pub fn empty() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// A complete host tree the built-in manifest accepts.
    pub fn klipper() -> Self {
        Self::empty()
            .with_file("Makefile", host_files::TOP_MAKEFILE)
            .with_file("README.md", host_files::README)
            .with_file("src/Makefile", host_files::SRC_MAKEFILE)
            .with_file("klippy/extras/bed_mesh.py", host_files::BED_MESH)
            .with_file("eddy-ng/probe_eddy_ng.py", host_files::PROBE_EDDY_NG)
            .with_file("eddy-ng/ldc1612_ng.py", host_files::LDC1612_NG)
            .with_file("eddy-ng/eddy-ng/sensor_ldc1612_ng.c", host_files::SENSOR_C)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Delete a file from the tree.
    #[allow(dead_code)]
    pub fn without_file(self, path: &str) -> Self {
        std::fs::remove_file(self.temp_dir.path().join(path)).expect("Failed to remove file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Read a file from the tree as text.
    #[allow(dead_code)]
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.temp_dir.path().join(path)).expect("Failed to read file")
    }

    /// Create a `graft` command targeting this tree, with color disabled.
    #[allow(dead_code)]
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("graft");
        cmd.env_remove("GRAFT_OVERLAY")
            .env_remove("GRAFT_MANIFEST")
            .arg("--color")
            .arg("never")
            .arg(self.path());
        cmd
    }
}

/// Every file under `root` keyed by relative path, with its bytes.
#[allow(dead_code)]
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.expect("Failed to walk tree"))
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(root)
                .expect("Entry outside root")
                .to_string_lossy()
                .replace('\\', "/");
            let bytes = std::fs::read(entry.path()).expect("Failed to read file");
            (relative, bytes)
        })
        .collect()
}

/// Remove write permission from `dir`.
///
/// Returns false when the current user can still write there (running as
/// root, for instance). Callers should skip their assertions in that case.
#[cfg(unix)]
#[allow(dead_code)]
pub fn make_read_only(dir: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o555))
        .expect("Failed to change permissions");
    let check = dir.join(".write-check");
    match std::fs::write(&check, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&check);
            false
        }
        Err(_) => true,
    }
}

/// Restore write permission so the temp dir can be cleaned up.
#[cfg(unix)]
#[allow(dead_code)]
pub fn make_writable(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to change permissions");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = HostFixture::empty();
        assert!(fixture.path().exists());
        assert!(snapshot(fixture.path()).is_empty());
    }

    #[test]
    fn test_klipper_fixture_layout() {
        let fixture = HostFixture::klipper();
        let files = snapshot(fixture.path());
        assert!(files.contains_key("src/Makefile"));
        assert!(files.contains_key("eddy-ng/eddy-ng/sensor_ldc1612_ng.c"));
        assert_eq!(files.len(), 7);
    }
}
