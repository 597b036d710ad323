//! # Manifest Schema and Parsing
//!
//! The manifest is the declarative description of one integration: where the
//! overlay tree lives, how to recognize a host tree, which files to copy, and
//! which patch rules to apply. Nothing here is discovered at runtime.
//!
//! A built-in manifest (the eddy-ng overlay for a Klipper tree) is embedded in
//! the binary. A YAML file with the same shape can replace it:
//!
//! ```yaml
//! overlay: eddy-ng
//! markers:
//!   files: [Makefile]
//!   dirs: [src, klippy/extras]
//! files:
//!   - source: probe_eddy_ng.py
//!     destination: klippy/extras/probe_eddy_ng.py
//! patches:
//!   - name: makefile-sources
//!     target: src/Makefile
//!     anchor: "sensor_ldc1612.c"
//!     marker: "eddy-ng:makefile-sources"
//!     payload: "src-$(CONFIG_WANT_LDC1612) += sensor_ldc1612_ng.c"
//! ```
//!
//! [`Manifest::validate`] enforces the invariants the engine relies on, so a
//! manifest that loads successfully is safe to run.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::normalize::NormalizeOptions;

const DEFAULT_MANIFEST: &str = include_str!("default_manifest.yaml");

/// One overlay file copied into the host tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileMapping {
    /// Path relative to the overlay root.
    pub source: PathBuf,
    /// Path relative to the host root.
    pub destination: PathBuf,
}

/// How a patch payload is placed relative to its anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatchKind {
    /// Insert the payload as a marker-delimited block after the anchor's line.
    #[default]
    InsertAfter,
    /// Replace the first occurrence of the anchor with the payload.
    Replace,
}

/// A named textual change to one host file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchRule {
    pub name: String,
    /// Path relative to the host root.
    pub target: PathBuf,
    /// Literal text expected in the unmodified target.
    pub anchor: String,
    pub payload: String,
    /// Token whose presence means the rule is applied.
    pub marker: String,
    #[serde(default)]
    pub kind: PatchKind,
    /// A missing target is skipped instead of failing.
    #[serde(default)]
    pub optional: bool,
    /// Line comment prefix for the block boundaries of `insert-after` rules.
    #[serde(default = "default_comment")]
    pub comment: String,
}

fn default_comment() -> String {
    "#".to_string()
}

impl PatchRule {
    /// Line that opens an inserted block.
    pub fn begin_line(&self) -> String {
        format!("{} >>> {}", self.comment, self.marker)
    }

    /// Line that closes an inserted block. It names the rule rather than
    /// repeating the marker, so an applied file holds the marker exactly once.
    pub fn end_line(&self) -> String {
        format!("{} <<< {}", self.comment, self.name)
    }
}

/// Entries that must exist at the top of a host tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepoMarkers {
    pub files: Vec<PathBuf>,
    pub dirs: Vec<PathBuf>,
}

/// The full declarative description of an integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Overlay tree location, relative to the host root.
    pub overlay: PathBuf,
    #[serde(default)]
    pub markers: RepoMarkers,
    #[serde(default)]
    pub files: Vec<FileMapping>,
    #[serde(default)]
    pub patches: Vec<PatchRule>,
    #[serde(default)]
    pub normalize: NormalizeOptions,
    /// Free-form lines printed after a successful install.
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Manifest {
    /// The manifest compiled into the binary.
    pub fn builtin() -> Result<Self> {
        parse(DEFAULT_MANIFEST)
    }

    /// Check every invariant the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if self.overlay.as_os_str().is_empty() {
            return invalid("overlay path is empty".to_string());
        }
        for marker in self.markers.files.iter().chain(&self.markers.dirs) {
            check_relative("marker", marker)?;
        }

        let mut destinations = HashSet::new();
        for mapping in &self.files {
            check_relative("source", &mapping.source)?;
            check_relative("destination", &mapping.destination)?;
            if !destinations.insert(&mapping.destination) {
                return invalid(format!(
                    "destination {} is declared by more than one file mapping",
                    mapping.destination.display()
                ));
            }
        }

        let mut names = HashSet::new();
        for rule in &self.patches {
            if rule.name.trim().is_empty() {
                return invalid("patch rule with an empty name".to_string());
            }
            if !names.insert(rule.name.as_str()) {
                return invalid(format!("patch rule '{}' is declared twice", rule.name));
            }
            check_relative("target", &rule.target)?;
            if rule.anchor.is_empty() {
                return invalid(format!("patch rule '{}' has an empty anchor", rule.name));
            }
            if rule.marker.trim().is_empty() || rule.marker.contains('\n') {
                return invalid(format!(
                    "patch rule '{}' needs a non-empty single-line marker",
                    rule.name
                ));
            }
            if rule.anchor.contains(&rule.marker) {
                return invalid(format!(
                    "patch rule '{}': marker occurs inside the anchor",
                    rule.name
                ));
            }
            match rule.kind {
                PatchKind::Replace => {
                    if rule.payload.matches(rule.marker.as_str()).count() != 1 {
                        return invalid(format!(
                            "patch rule '{}': replace payload must contain the marker exactly once",
                            rule.name
                        ));
                    }
                }
                PatchKind::InsertAfter => {
                    if rule.payload.contains(&rule.marker) {
                        return invalid(format!(
                            "patch rule '{}': insert payload must not repeat the marker",
                            rule.name
                        ));
                    }
                    if rule.end_line().contains(&rule.marker)
                        || rule.payload.contains(&rule.end_line())
                    {
                        return invalid(format!(
                            "patch rule '{}': block end line {:?} is ambiguous",
                            rule.name,
                            rule.end_line()
                        ));
                    }
                }
            }
        }

        for rule in &self.patches {
            for other in self.patches.iter().filter(|other| other.name != rule.name) {
                if marker_shadowed_by(&rule.marker, other) {
                    return invalid(format!(
                        "marker {:?} of patch rule '{}' also occurs in patch rule '{}'",
                        rule.marker, rule.name, other.name
                    ));
                }
            }
        }

        if self.normalize.max_width == 0 {
            return invalid("normalize.max_width must be positive".to_string());
        }

        Ok(())
    }
}

/// Whether `marker` appears anywhere `other` can put text into a file, or in
/// the text `other` expects to find there. Either way the marker would report
/// its rule as applied when it is not.
fn marker_shadowed_by(marker: &str, other: &PatchRule) -> bool {
    other.marker.contains(marker)
        || other.begin_line().contains(marker)
        || other.end_line().contains(marker)
        || other.payload.contains(marker)
        || other.anchor.contains(marker)
}

fn invalid<T>(message: String) -> Result<T> {
    Err(Error::InvalidManifest { message })
}

fn check_relative(what: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return invalid(format!("{what} path is empty"));
    }
    if path.is_absolute() {
        return invalid(format!("{what} path {} must be relative", path.display()));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return invalid(format!(
            "{what} path {} must not contain '..'",
            path.display()
        ));
    }
    Ok(())
}

/// Parse and validate a manifest from a YAML string.
pub fn parse(yaml_content: &str) -> Result<Manifest> {
    let manifest: Manifest = serde_yaml::from_str(yaml_content)?;
    manifest.validate()?;
    Ok(manifest)
}

/// Load a manifest from a YAML file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Manifest> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content)
}
