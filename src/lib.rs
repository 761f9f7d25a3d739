//! dupequarantine - duplicate file quarantine
//!
//! Scans a directory tree, finds files whose content is byte-for-byte
//! identical to another file in the tree, and moves every copy but the first
//! into a `Quarantined` directory under the scanned root.
//!
//! The pipeline runs in three phases:
//!
//! 1. [`scanner::Walker`] enumerates candidate files, applying the
//!    [`scanner::ExclusionPolicy`].
//! 2. [`duplicates::Classifier`] narrows candidates by size, partial digest
//!    and full digest, and emits [`duplicates::DuplicatePair`]s.
//! 3. [`quarantine::QuarantineMover`] moves each duplicate into quarantine.
//!
//! # Example
//!
//! ```no_run
//! use dupequarantine::{run_scan, RunOptions};
//! use std::path::Path;
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! let options = RunOptions::default().with_dry_run(true);
//! let report = run_scan(Path::new("/photos"), &options, Arc::new(AtomicBool::new(false)), None);
//! for line in report.summary_lines() {
//!     println!("{line}");
//! }
//! ```

pub mod cli;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod quarantine;
pub mod scanner;
pub mod signal;

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;

use crate::cli::Cli;
use crate::duplicates::{Classifier, ClassifierConfig};
use crate::error::{ExitCode, InputError};
use crate::output::RunReport;
use crate::progress::{Progress, ProgressCallback, PHASE_WALK};
use crate::quarantine::{MoveConfig, QuarantineMover};
use crate::scanner::{ExclusionPolicy, Walker, WalkerConfig};

pub use crate::quarantine::QUARANTINE_DIR_NAME;

/// Options for one run, independent of how they were supplied.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Exclusion rules for the walk; the quarantine directory is added
    pub policy: ExclusionPolicy,
    /// Leave zero-byte files out of the scan
    pub skip_empty: bool,
    /// Digesting threads
    pub io_threads: usize,
    /// Plan moves without performing them
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            policy: ExclusionPolicy::default(),
            skip_empty: false,
            io_threads: duplicates::classifier::DEFAULT_IO_THREADS,
            dry_run: false,
        }
    }
}

impl RunOptions {
    /// Replace the exclusion policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ExclusionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Skip zero-byte files.
    #[must_use]
    pub fn with_skip_empty(mut self, skip: bool) -> Self {
        self.skip_empty = skip;
        self
    }

    /// Set the number of digesting threads.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Walk, classify and quarantine `root`.
///
/// `root` must already be a validated, absolute directory. The quarantine
/// directory is `root/Quarantined`. Per-file problems are counted in the
/// report; nothing here is fatal. Setting `shutdown` stops the run between
/// files or between moves.
pub fn run_scan(
    root: &Path,
    options: &RunOptions,
    shutdown: Arc<AtomicBool>,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> RunReport {
    let quarantine_dir = root.join(QUARANTINE_DIR_NAME);
    let mut report = RunReport::new(root, &quarantine_dir, options.dry_run);

    // Phase 1: walk
    let walker_config = WalkerConfig::new(options.policy.clone().with_quarantine_dir(&quarantine_dir))
        .with_skip_empty(options.skip_empty)
        .with_shutdown_flag(Arc::clone(&shutdown));
    let mut walker = Walker::new(root, walker_config);
    if let Some(ref callback) = progress {
        let total = walker.count_candidates();
        walker = walker.with_progress_callback(Arc::clone(callback));
        callback.on_phase_start(PHASE_WALK, total);
    }

    log::info!("Scanning {}", root.display());
    let mut records = Vec::new();
    for entry in walker.walk() {
        match entry {
            Ok(record) => records.push(record),
            Err(_) => report.summary.enumeration_errors += 1,
        }
    }
    report.summary.files_scanned = records.len();

    if let Some(ref callback) = progress {
        callback.on_phase_end(PHASE_WALK);
    }
    log::info!(
        "Walk complete: {} files, {} errors",
        records.len(),
        report.summary.enumeration_errors
    );

    if shutdown.load(Ordering::SeqCst) {
        report.summary.interrupted = true;
        return report;
    }

    // Phase 2: classify
    let mut classifier_config = ClassifierConfig::default()
        .with_io_threads(options.io_threads)
        .with_shutdown_flag(Arc::clone(&shutdown));
    if let Some(ref callback) = progress {
        classifier_config = classifier_config.with_progress_callback(Arc::clone(callback));
    }
    let (pairs, stats) = Classifier::new(classifier_config).classify(records);
    report.summary.duplicate_pairs = pairs.len();
    report.summary.hash_errors = stats.hash_failures;

    if stats.interrupted {
        report.summary.interrupted = true;
        return report;
    }

    // Phase 3: quarantine
    let mut move_config = MoveConfig::default()
        .with_dry_run(options.dry_run)
        .with_shutdown_flag(Arc::clone(&shutdown));
    if let Some(ref callback) = progress {
        move_config = move_config.with_progress_callback(Arc::clone(callback));
    }
    let moves = QuarantineMover::new(move_config).quarantine(&pairs, &quarantine_dir);
    report.record_moves(&moves);

    report
}

/// Run the application for parsed command-line arguments.
///
/// Returns the exit code for a completed or interrupted run.
///
/// # Errors
///
/// Returns an error if the root is not a readable directory, the Ctrl+C
/// handler cannot be installed, or the JSON report cannot be written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let started = Instant::now();

    let root = InputError::validate_root(&cli.root)?;
    let shutdown = signal::install_handler().context("Failed to set up Ctrl+C handling")?;

    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::with_plain(
        cli.quiet || cli.json,
        cli.plain_progress,
    ));
    let options = RunOptions::default()
        .with_skip_empty(cli.skip_empty)
        .with_io_threads(usize::from(cli.io_threads))
        .with_dry_run(cli.dry_run);

    let mut report = run_scan(&root, &options, shutdown, Some(progress));
    let exit_code = report.exit_code();
    report.finish(started.elapsed(), exit_code);

    if cli.json {
        report
            .write_to(&mut io::stdout().lock(), true)
            .context("Failed to write JSON report")?;
    } else if !cli.quiet {
        for line in report.summary_lines() {
            println!("{line}");
        }
    }

    Ok(exit_code)
}
