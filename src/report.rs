//! Per-item outcomes and the aggregated run report.

use std::fmt;
use std::path::PathBuf;

use crate::error::Error;

/// What the engine did, or would do, to one item.
#[derive(Debug)]
pub enum Status {
    Applied,
    AlreadyApplied,
    /// The item was not relevant or not ours to touch.
    Skipped(String),
    Failed(Error),
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Applied => "applied",
            Status::AlreadyApplied => "already-applied",
            Status::Skipped(_) => "skipped",
            Status::Failed(_) => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Status::Failed(_))
    }
}

/// The item an outcome refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// An overlay file, named by its destination in the host tree.
    File { destination: PathBuf },
    /// A patch rule and the file it targets.
    Patch { name: String, target: PathBuf },
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::File { destination } => write!(f, "file {}", destination.display()),
            Item::Patch { name, target } => write!(f, "patch {} ({})", name, target.display()),
        }
    }
}

#[derive(Debug)]
pub struct OperationOutcome {
    pub item: Item,
    pub status: Status,
}

impl OperationOutcome {
    pub fn new(item: Item, status: Status) -> Self {
        Self { item, status }
    }

    /// `<status> <item>[: <detail>]`
    pub fn line(&self) -> String {
        match &self.status {
            Status::Skipped(reason) => format!("{} {}: {}", self.status.label(), self.item, reason),
            Status::Failed(error) => format!(
                "{} {}: {}: {}",
                self.status.label(),
                self.item,
                error.kind(),
                error
            ),
            _ => format!("{} {}", self.status.label(), self.item),
        }
    }
}

/// Whether a run installs or uninstalls the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Install,
    Uninstall,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Install => write!(f, "install"),
            Mode::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// Everything one run did, in execution order.
#[derive(Debug)]
pub struct InstallReport {
    pub mode: Mode,
    pub dry_run: bool,
    pub outcomes: Vec<OperationOutcome>,
}

/// Outcome tallies by status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub applied: usize,
    pub already_applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl InstallReport {
    pub fn new(mode: Mode, dry_run: bool) -> Self {
        Self {
            mode,
            dry_run,
            outcomes: Vec::new(),
        }
    }

    /// True when no item failed.
    pub fn success(&self) -> bool {
        !self.outcomes.iter().any(|o| o.status.is_failed())
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for outcome in &self.outcomes {
            match outcome.status {
                Status::Applied => counts.applied += 1,
                Status::AlreadyApplied => counts.already_applied += 1,
                Status::Skipped(_) => counts.skipped += 1,
                Status::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failed())
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let counts = self.counts();
        format!(
            "{}{} {}: {} applied, {} already applied, {} skipped, {} failed",
            if self.dry_run { "dry run: " } else { "" },
            self.mode,
            if self.success() { "succeeded" } else { "failed" },
            counts.applied,
            counts.already_applied,
            counts.skipped,
            counts.failed
        )
    }
}
