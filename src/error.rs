//! # Error Handling
//!
//! This module defines the centralized error type for the `graft` engine. It
//! uses the `thiserror` library to create an `Error` enum covering every
//! anticipated failure mode, each with enough context to name the offending
//! file or rule in a report line.
//!
//! Errors fall into two groups:
//!
//! - **Structural errors** (`InvalidRepository`, `OverlayNotFound`,
//!   `InvalidManifest`, `Yaml`) abort a run before anything is written. They
//!   are returned as `Err` from the orchestrator.
//! - **Item errors** (`MissingSource`, `MissingTarget`, `AnchorNotFound`,
//!   `CorruptBlock`, `ProvenanceMismatch`, `Read`, `Write`) are isolated to
//!   one file mapping or patch rule and are recorded as failed outcomes in the
//!   report.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for graft operations
#[derive(Error, Debug)]
pub enum Error {
    /// No candidate directory contained the marker entries of a host tree.
    #[error("Invalid repository: {} is not a host tree (missing: {})", path.display(), missing.join(", "))]
    InvalidRepository { path: PathBuf, missing: Vec<String> },

    /// The overlay tree itself is absent.
    #[error("Overlay tree not found at {}", path.display())]
    OverlayNotFound { path: PathBuf },

    /// An overlay source file named by a file mapping does not exist.
    #[error("Missing overlay source: {}", path.display())]
    MissingSource { path: PathBuf },

    /// A patch target file does not exist in the host tree.
    #[error("Missing patch target: {}", path.display())]
    MissingTarget { path: PathBuf },

    /// The patch target exists but no longer contains the rule's anchor text.
    #[error("Anchor not found for rule '{rule}' in {}: {anchor:?}", path.display())]
    AnchorNotFound {
        rule: String,
        path: PathBuf,
        anchor: String,
    },

    /// The marker is present but the applied block cannot be delimited.
    #[error("Applied block for rule '{rule}' in {} is damaged: {message}", path.display())]
    CorruptBlock {
        rule: String,
        path: PathBuf,
        message: String,
    },

    /// An installed destination cannot be confirmed as the engine's own copy.
    #[error("Refusing to remove {}: {reason}", path.display())]
    ProvenanceMismatch { path: PathBuf, reason: String },

    /// Reading a file failed.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing, renaming, or deleting a file failed.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest violates one of its invariants.
    #[error("Invalid manifest: {message}")]
    InvalidManifest { message: String },

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short machine-friendly name of the error kind, used in report lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidRepository { .. } => "InvalidRepository",
            Error::OverlayNotFound { .. } => "OverlayNotFound",
            Error::MissingSource { .. } => "MissingSource",
            Error::MissingTarget { .. } => "MissingTarget",
            Error::AnchorNotFound { .. } => "AnchorNotFound",
            Error::CorruptBlock { .. } => "CorruptBlock",
            Error::ProvenanceMismatch { .. } => "ProvenanceMismatch",
            Error::Read { .. } => "ReadFailure",
            Error::Write { .. } => "WriteFailure",
            Error::InvalidManifest { .. } => "InvalidManifest",
            Error::Yaml(_) => "InvalidManifest",
            Error::Io(_) => "Io",
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
