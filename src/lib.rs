//! # graft
//!
//! This library installs an overlay source tree into a larger host tree and
//! removes it again, leaving the host exactly as it was. It is used by the
//! `graft` command-line tool but can be driven directly.
//!
//! ## Quick Example
//!
//! ```no_run
//! use graft::manifest::Manifest;
//! use graft::orchestrator::{self, RunOptions};
//! use graft::report::Mode;
//!
//! let manifest = Manifest::builtin().unwrap();
//! let root = graft::locate::locate(None, &manifest.markers).unwrap();
//! let report = orchestrator::run(&root, &manifest, Mode::Install, &RunOptions::default()).unwrap();
//! println!("{}", report.summary());
//! ```
//!
//! ## Core Concepts
//!
//! - **Manifest (`manifest`)**: the declarative list of file mappings and patch
//!   rules, plus the marker entries that identify a host tree.
//! - **Locator (`locate`)**: finds and validates the host root.
//! - **Normalizer (`normalize`)**: whitespace cleanup and rewrap applied to
//!   every file the engine copies.
//! - **Overlay (`overlay`)**: copies overlay files in and deletes them again.
//! - **Patches (`patch`)**: idempotent, reversible text edits located by
//!   anchors and recorded by markers.
//! - **Host tree (`host`)**: atomic writes, and in-memory staging for dry runs.
//! - **Orchestrator (`orchestrator`)**: sequences the steps per mode and
//!   returns an `InstallReport`.
//!
//! No state is kept between runs: the markers written into host files are the
//! only record of what has been applied.

pub mod error;
pub mod host;
pub mod locate;
pub mod manifest;
pub mod normalize;
pub mod orchestrator;
pub mod output;
pub mod overlay;
pub mod patch;
pub mod report;

#[cfg(test)]
mod normalize_proptest;
