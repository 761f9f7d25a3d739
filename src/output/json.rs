//! Run report and its JSON rendering.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "root": "/photos",
//!   "quarantine_dir": "/photos/Quarantined",
//!   "dry_run": false,
//!   "summary": {
//!     "files_scanned": 1200,
//!     "enumeration_errors": 1,
//!     "hash_errors": 0,
//!     "duplicate_pairs": 14,
//!     "moves_succeeded": 14,
//!     "moves_failed": 0,
//!     "bytes_quarantined": 52428800,
//!     "duration_ms": 2345,
//!     "interrupted": false,
//!     "exit_code": 0,
//!     "exit_code_name": "QD000"
//!   },
//!   "moves": [
//!     { "source": "/photos/b.jpg", "destination": "/photos/Quarantined/b.jpg",
//!       "original": "/photos/a.jpg", "size": 3745 }
//!   ],
//!   "failures": [
//!     { "path": "/photos/c.jpg", "error": "file modified since scan: /photos/c.jpg" }
//!   ]
//! }
//! ```

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use bytesize::ByteSize;
use serde::Serialize;

use crate::error::ExitCode;
use crate::quarantine::{BatchMoveResult, MovedFile};

/// Counters for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Files yielded by the walker
    pub files_scanned: usize,
    /// Entries the walker could not list or stat
    pub enumeration_errors: usize,
    /// Files the classifier could not read
    pub hash_errors: usize,
    /// Duplicate pairs found
    pub duplicate_pairs: usize,
    /// Duplicates moved (or planned, in a dry run)
    pub moves_succeeded: usize,
    /// Duplicates that could not be moved
    pub moves_failed: usize,
    /// Bytes moved into quarantine
    pub bytes_quarantined: u64,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// The run stopped early on Ctrl+C
    pub interrupted: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "QD000")
    pub exit_code_name: String,
}

/// A single move in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportMove {
    /// Where the duplicate was
    pub source: String,
    /// Where it was moved to
    pub destination: String,
    /// The original that stays in place
    pub original: String,
    /// Size in bytes
    pub size: u64,
}

impl From<&MovedFile> for ReportMove {
    fn from(moved: &MovedFile) -> Self {
        Self {
            source: moved.source.display().to_string(),
            destination: moved.destination.display().to_string(),
            original: moved.original.display().to_string(),
            size: moved.size,
        }
    }
}

/// A single failed move in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportFailure {
    /// The duplicate that stayed in place
    pub path: String,
    /// What went wrong
    pub error: String,
}

/// Everything one run did, ready for the terminal or for JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Scanned root
    pub root: String,
    /// Quarantine directory
    pub quarantine_dir: String,
    /// Nothing was moved
    pub dry_run: bool,
    /// Counters
    pub summary: RunSummary,
    /// Successful moves
    pub moves: Vec<ReportMove>,
    /// Failed moves
    pub failures: Vec<ReportFailure>,
}

impl RunReport {
    /// Create an empty report for `root`.
    #[must_use]
    pub fn new(root: &Path, quarantine_dir: &Path, dry_run: bool) -> Self {
        Self {
            root: root.display().to_string(),
            quarantine_dir: quarantine_dir.display().to_string(),
            dry_run,
            summary: RunSummary::default(),
            moves: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Fold in the mover's results.
    pub fn record_moves(&mut self, result: &BatchMoveResult) {
        self.summary.moves_succeeded = result.success_count();
        self.summary.moves_failed = result.failure_count();
        self.summary.bytes_quarantined = result.bytes_quarantined;
        self.summary.interrupted |= result.interrupted;
        self.moves = result.moved.iter().map(ReportMove::from).collect();
        self.failures = result
            .failures
            .iter()
            .map(|(path, error)| ReportFailure {
                path: path.display().to_string(),
                error: error.clone(),
            })
            .collect();
    }

    /// Set duration and exit code.
    pub fn finish(&mut self, duration: Duration, exit_code: ExitCode) {
        self.summary.duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.summary.exit_code = exit_code.as_i32();
        self.summary.exit_code_name = exit_code.code_prefix().to_string();
    }

    /// Exit code implied by the report.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.summary.interrupted {
            ExitCode::Interrupted
        } else {
            ExitCode::Success
        }
    }

    /// Human-readable end-of-run summary lines.
    #[must_use]
    pub fn summary_lines(&self) -> Vec<String> {
        let s = &self.summary;
        let verb = if self.dry_run {
            "Would quarantine"
        } else {
            "Quarantined"
        };
        let mut lines = vec![
            format!("Scanned {} files", s.files_scanned),
            format!("Found {} duplicate(s)", s.duplicate_pairs),
            format!(
                "{verb} {} file(s) ({}) into {}",
                s.moves_succeeded,
                ByteSize::b(s.bytes_quarantined),
                self.quarantine_dir
            ),
        ];
        if s.enumeration_errors + s.hash_errors + s.moves_failed > 0 {
            lines.push(format!(
                "Errors: {} unreadable entries, {} unhashable files, {} failed moves",
                s.enumeration_errors, s.hash_errors, s.moves_failed
            ));
        }
        if s.interrupted {
            lines.push("Interrupted before completion".to_string());
        }
        lines
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
