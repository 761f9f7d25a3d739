//! Command-line interface definitions.
//!
//! One positional argument, the root directory, plus operator flags. The
//! quarantine directory is always `<ROOT>/Quarantined`.
//!
//! # Example
//!
//! ```bash
//! # Quarantine duplicates under ~/Pictures
//! dupequarantine ~/Pictures
//!
//! # Show what would be moved, with line-based progress
//! dupequarantine --dry-run --plain-progress ~/Pictures
//!
//! # Machine-readable report
//! dupequarantine --json -q ~/Pictures
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Find byte-identical duplicate files and move the extra copies into a
/// quarantine directory.
///
/// The first copy of every duplicate set stays where it is; the others are
/// moved into `<ROOT>/Quarantined`.
#[derive(Debug, Parser)]
#[command(name = "dupequarantine")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory tree to scan
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print progress as plain lines instead of progress bars
    #[arg(long)]
    pub plain_progress: bool,

    /// Report what would be quarantined without moving anything
    #[arg(long)]
    pub dry_run: bool,

    /// Leave zero-byte files alone instead of quarantining empty duplicates
    #[arg(long)]
    pub skip_empty: bool,

    /// Number of I/O threads for hashing
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N", default_value = "4", value_parser = clap::value_parser!(u16).range(1..))]
    pub io_threads: u16,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}
