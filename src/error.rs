//! Structured error handling and exit codes.

use std::path::PathBuf;

use serde::Serialize;

/// Exit codes for the dupequarantine binary.
///
/// - 0: The run completed, whether or not duplicates were found or every
///   individual file operation succeeded
/// - 1: Invalid input or an unexpected fatal error
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// The run completed.
    Success = 0,
    /// Bad input or a fatal error before the run could complete.
    InputError = 1,
    /// Interrupted by user (Ctrl+C).
    Interrupted = crate::signal::EXIT_CODE_INTERRUPTED as isize,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "QD000",
            Self::InputError => "QD001",
            Self::Interrupted => "QD130",
        }
    }
}

/// The root argument cannot be scanned.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// The root does not exist.
    #[error("root directory does not exist: {0}")]
    NotFound(PathBuf),

    /// The root exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root cannot be listed.
    #[error("cannot read directory {path}: {source}")]
    Unreadable {
        /// The root as given
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl InputError {
    /// Check that `path` is a readable directory and return its absolute form.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] describing why the root cannot be scanned.
    pub fn validate_root(path: &std::path::Path) -> Result<PathBuf, Self> {
        let meta = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Unreadable {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        if !meta.is_dir() {
            return Err(Self::NotADirectory(path.to_path_buf()));
        }

        std::fs::read_dir(path).map_err(|e| Self::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;

        path.canonicalize().map_err(|e| Self::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "QD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
