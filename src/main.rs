//! # graft CLI
//!
//! Binary entry point for the `graft` command-line tool.
//!
//! Its responsibilities are parsing arguments with `clap`, setting up logging,
//! running the engine, and mapping the report to an exit code. The engine
//! itself lives in the library crate.

mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<ExitCode> {
    let cli = cli::Cli::parse();
    cli.execute()
}
