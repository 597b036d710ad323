//! CLI argument parsing and command execution

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use graft::locate::locate;
use graft::manifest::{self, Manifest};
use graft::orchestrator::{self, RunOptions};
use graft::output::{render_report, OutputConfig};
use graft::report::Mode;

/// graft - Install an overlay source tree into a host repository, or remove it
#[derive(Parser, Debug)]
#[command(name = "graft")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Host repository directory (defaults to auto-detection from the current directory)
    #[arg(value_name = "TARGET")]
    target: Option<PathBuf>,

    /// Uninstall the overlay from the repository
    #[arg(short, long)]
    uninstall: bool,

    /// Show what would be done without making changes
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Overlay tree location (defaults to the manifest's overlay path inside the target)
    #[arg(long, value_name = "PATH", env = "GRAFT_OVERLAY")]
    overlay: Option<PathBuf>,

    /// Manifest file replacing the built-in one
    #[arg(long, value_name = "PATH", env = "GRAFT_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Suppress the report; only errors are printed
    #[arg(short, long)]
    quiet: bool,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

impl Cli {
    /// Execute the run described by the arguments
    pub fn execute(self) -> Result<ExitCode> {
        init_logging(&self.log_level);
        let output = OutputConfig::from_env_and_flag(&self.color);

        let manifest = match &self.manifest {
            Some(path) => manifest::from_file(path)
                .with_context(|| format!("Failed to load manifest {}", path.display()))?,
            None => Manifest::builtin()?,
        };

        let root = locate(self.target.as_deref(), &manifest.markers)?;
        if self.target.is_none() && !self.quiet {
            println!("Auto-detected repository root: {}", root.display());
        }

        let mode = if self.uninstall {
            Mode::Uninstall
        } else {
            Mode::Install
        };
        let options = RunOptions {
            dry_run: self.dry_run,
            overlay: self.overlay,
        };

        if !self.quiet && self.dry_run {
            println!("DRY RUN MODE - No changes will be made");
        }

        let report = orchestrator::run(&root, &manifest, mode, &options)?;

        if !self.quiet {
            for line in render_report(&output, &report) {
                println!("{line}");
            }
        }

        if !report.success() {
            for failure in report.failures() {
                eprintln!("error: {}", failure.line());
            }
            return Ok(ExitCode::FAILURE);
        }

        if !self.quiet && mode == Mode::Install && !self.dry_run {
            for note in &manifest.notes {
                println!("{note}");
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// Log to stderr so stdout carries only the report. `RUST_LOG` wins over
/// `--log-level` when set.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
