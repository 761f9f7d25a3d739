//! Moving confirmed duplicates into the quarantine directory.
//!
//! # Overview
//!
//! For every [`DuplicatePair`] the mover:
//!
//! 1. Checks the duplicate still has the size and modification time seen
//!    during the scan, and that the original is still in place.
//! 2. Creates the quarantine directory if this is the first move.
//! 3. Picks a collision-free name (see [`naming`](super::naming)).
//! 4. Links the file under its new name, which fails rather than replace
//!    an existing entry, then unlinks the old name. If the link crosses a
//!    filesystem boundary the content is staged in a temporary file inside
//!    the quarantine directory, synced, persisted under the final name
//!    without replacing anything, and only then is the source removed.
//!
//! A failure at any point leaves the duplicate where it was and removes
//! whatever was written to the quarantine directory. The original of a pair
//! is never opened for writing, moved or removed.
//!
//! # Example
//!
//! ```no_run
//! use dupequarantine::quarantine::{MoveConfig, QuarantineMover};
//! use std::path::Path;
//!
//! # let pairs = Vec::new();
//! let mover = QuarantineMover::new(MoveConfig::default());
//! let result = mover.quarantine(&pairs, Path::new("/photos/Quarantined"));
//! println!("{}", result.summary());
//! ```

use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use bytesize::ByteSize;
use thiserror::Error;

use super::naming::{unique_destination, unique_destination_with};
use crate::duplicates::DuplicatePair;
use crate::progress::{ProgressCallback, PHASE_QUARANTINE};
use crate::scanner::FileRecord;

/// Error type for quarantine moves.
#[derive(Debug, Error)]
pub enum MoveError {
    /// The duplicate vanished after the scan.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Reading, removing or writing was not allowed.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The duplicate changed since it was scanned.
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// The original of the pair is gone, so the duplicate may be the last copy.
    #[error("original {original} is missing, keeping {duplicate}")]
    OriginalMissing {
        /// The duplicate that was left in place
        duplicate: PathBuf,
        /// The original that could not be found
        original: PathBuf,
    },

    /// Something appeared at the chosen destination before the move finished.
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    /// Copying across filesystems failed; nothing was changed.
    #[error("copy to quarantine failed for {path}: {message}")]
    CopyFailed {
        /// Source file
        path: PathBuf,
        /// Underlying error text
        message: String,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl MoveError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => Self::DestinationExists(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::DestinationExists(p)
            | Self::CopyFailed { path: p, .. }
            | Self::Io { path: p, .. }
            | Self::OriginalMissing { duplicate: p, .. } => p,
        }
    }
}

/// A duplicate that was moved (or, in a dry run, would be moved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedFile {
    /// Where the duplicate was
    pub source: PathBuf,
    /// Where it is now
    pub destination: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// The original it duplicates
    pub original: PathBuf,
}

/// Results of a batch of quarantine moves.
#[derive(Debug, Clone, Default)]
pub struct BatchMoveResult {
    /// Successful moves, in pair order
    pub moved: Vec<MovedFile>,
    /// Failed moves with their error text
    pub failures: Vec<(PathBuf, String)>,
    /// Total bytes moved into quarantine
    pub bytes_quarantined: u64,
    /// Nothing was touched; `moved` lists planned destinations
    pub dry_run: bool,
    /// The batch stopped early on shutdown
    pub interrupted: bool,
}

impl BatchMoveResult {
    /// Number of successful moves.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.moved.len()
    }

    /// Number of failed moves.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if all moves succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the batch.
    #[must_use]
    pub fn summary(&self) -> String {
        let verb = if self.dry_run {
            "Would quarantine"
        } else {
            "Quarantined"
        };
        let size = ByteSize::b(self.bytes_quarantined);
        if self.all_succeeded() {
            format!("{verb} {} file(s), {size}", self.success_count())
        } else {
            format!(
                "{verb} {} file(s), {} failed, {size}",
                self.success_count(),
                self.failure_count()
            )
        }
    }
}

/// Configuration for the mover.
#[derive(Clone, Default)]
pub struct MoveConfig {
    /// Report planned destinations without touching anything
    pub dry_run: bool,
    /// Optional shutdown flag, checked between pairs
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback, notified after each move
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for MoveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoveConfig")
            .field("dry_run", &self.dry_run)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl MoveConfig {
    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Moves duplicates into the quarantine directory, one at a time.
#[derive(Debug, Default)]
pub struct QuarantineMover {
    config: MoveConfig,
}

impl QuarantineMover {
    /// Create a mover.
    #[must_use]
    pub fn new(config: MoveConfig) -> Self {
        Self { config }
    }

    /// Quarantine the duplicate of every pair under `quarantine_root`.
    ///
    /// `quarantine_root` is created, with its parents, right before the first
    /// move. Failures are recorded per pair and never stop the batch.
    pub fn quarantine(&self, pairs: &[DuplicatePair], quarantine_root: &Path) -> BatchMoveResult {
        let mut result = BatchMoveResult {
            dry_run: self.config.dry_run,
            ..BatchMoveResult::default()
        };
        if pairs.is_empty() {
            return result;
        }

        let total = pairs.len();
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(PHASE_QUARANTINE, total);
        }
        log::info!(
            "{} {} duplicate(s) into {}",
            if self.config.dry_run { "Planning" } else { "Moving" },
            total,
            quarantine_root.display()
        );

        let mut root_ready = false;
        let mut planned: Vec<PathBuf> = Vec::new();

        for pair in pairs {
            if self.config.is_shutdown_requested() {
                log::info!("Quarantine interrupted by shutdown signal");
                result.interrupted = true;
                break;
            }

            let source = &pair.duplicate.path;
            let outcome = if self.config.dry_run {
                self.plan_one(pair, quarantine_root, &mut planned)
            } else {
                self.move_one(pair, quarantine_root, &mut root_ready)
            };

            match outcome {
                Ok(moved) => {
                    log::info!(
                        "{} {} -> {}",
                        if self.config.dry_run { "Would move" } else { "Moved" },
                        moved.source.display(),
                        moved.destination.display()
                    );
                    result.bytes_quarantined += moved.size;
                    result.moved.push(moved);
                    if let Some(ref callback) = self.config.progress_callback {
                        callback.on_item_completed(pair.duplicate.size);
                        callback.on_progress(
                            result.moved.len(),
                            source.to_string_lossy().as_ref(),
                        );
                    }
                }
                Err(e) => {
                    log::warn!("Failed to quarantine {}: {}", source.display(), e);
                    if let Some(ref callback) = self.config.progress_callback {
                        callback.on_message(&format!("Kept {}: {}", source.display(), e));
                    }
                    result.failures.push((source.clone(), e.to_string()));
                }
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_QUARANTINE);
        }
        log::info!("{}", result.summary());

        result
    }

    /// Verify, pick a name and move a single duplicate.
    fn move_one(
        &self,
        pair: &DuplicatePair,
        quarantine_root: &Path,
        root_ready: &mut bool,
    ) -> Result<MovedFile, MoveError> {
        verify_pair(pair)?;

        if !*root_ready {
            fs::create_dir_all(quarantine_root)
                .map_err(|e| MoveError::from_io(quarantine_root, e))?;
            *root_ready = true;
        }

        let source = &pair.duplicate.path;
        let name = source
            .file_name()
            .ok_or_else(|| MoveError::NotFound(source.clone()))?;
        let destination = unique_destination(quarantine_root, name);

        relocate(source, &destination, pair.duplicate.modified)?;

        Ok(MovedFile {
            source: source.clone(),
            destination,
            size: pair.duplicate.size,
            original: pair.original.path.clone(),
        })
    }

    /// Dry-run counterpart of [`move_one`](Self::move_one).
    fn plan_one(
        &self,
        pair: &DuplicatePair,
        quarantine_root: &Path,
        planned: &mut Vec<PathBuf>,
    ) -> Result<MovedFile, MoveError> {
        verify_pair(pair)?;

        let source = &pair.duplicate.path;
        let name = source
            .file_name()
            .ok_or_else(|| MoveError::NotFound(source.clone()))?;
        let destination =
            unique_destination_with(quarantine_root, name, |p| planned.iter().any(|q| q == p));
        planned.push(destination.clone());

        Ok(MovedFile {
            source: source.clone(),
            destination,
            size: pair.duplicate.size,
            original: pair.original.path.clone(),
        })
    }
}

/// Check the pair against the filesystem before anything is moved.
///
/// # Errors
///
/// - `Modified` if the duplicate's size or mtime changed, or it is no longer
///   a regular file
/// - `OriginalMissing` if the original is gone
/// - `NotFound` / `PermissionDenied` / `Io` if the duplicate can't be stat'ed
pub fn verify_pair(pair: &DuplicatePair) -> Result<(), MoveError> {
    verify_unchanged(&pair.duplicate)?;

    match pair.original.path.symlink_metadata() {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(MoveError::OriginalMissing {
            duplicate: pair.duplicate.path.clone(),
            original: pair.original.path.clone(),
        }),
    }
}

/// Check a record still matches the file on disk.
///
/// # Errors
///
/// Returns [`MoveError::Modified`] if size, mtime or file type changed.
pub fn verify_unchanged(record: &FileRecord) -> Result<(), MoveError> {
    let path = &record.path;
    let meta = path
        .symlink_metadata()
        .map_err(|e| MoveError::from_io(path, e))?;

    if !meta.is_file() {
        log::warn!("No longer a regular file: {}", path.display());
        return Err(MoveError::Modified(path.clone()));
    }
    if meta.len() != record.size {
        log::warn!(
            "File modified since scan: {} (size changed from {} to {})",
            path.display(),
            record.size,
            meta.len()
        );
        return Err(MoveError::Modified(path.clone()));
    }
    if let Ok(current) = meta.modified() {
        if current != record.modified && record.modified != SystemTime::UNIX_EPOCH {
            log::warn!(
                "File modified since scan: {} (mtime changed)",
                path.display()
            );
            return Err(MoveError::Modified(path.clone()));
        }
    }
    Ok(())
}

/// Move `source` to `destination` without ever replacing an existing file.
///
/// On one filesystem the file is hard-linked under its new name and the old
/// name is then unlinked; the link fails if `destination` exists. Across
/// filesystems, or where hard links are unavailable, it falls back to
/// [`copy_then_remove`].
///
/// # Errors
///
/// Returns [`MoveError`] with the source left in place and nothing left at
/// `destination`.
pub fn relocate(source: &Path, destination: &Path, mtime: SystemTime) -> Result<(), MoveError> {
    match fs::hard_link(source, destination) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(MoveError::DestinationExists(destination.to_path_buf()));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(MoveError::from_io(source, e));
        }
        Err(e) => {
            log::debug!(
                "Cannot link {} into quarantine ({}), copying instead",
                source.display(),
                e
            );
            return copy_then_remove(source, destination, mtime);
        }
    }

    if let Err(e) = fs::remove_file(source) {
        // Drop the new name so the file is not left under both
        if let Err(cleanup) = fs::remove_file(destination) {
            log::error!(
                "Could not remove link {} after failed move: {}",
                destination.display(),
                cleanup
            );
        }
        return Err(MoveError::from_io(source, e));
    }

    Ok(())
}

/// Stage a copy next to `destination`, persist it without clobbering, then
/// remove `source`.
///
/// # Errors
///
/// Returns [`MoveError`]; on error `source` is untouched and `destination`
/// does not exist (unless something else created it concurrently).
pub fn copy_then_remove(
    source: &Path,
    destination: &Path,
    mtime: SystemTime,
) -> Result<(), MoveError> {
    let staging_dir = destination.parent().unwrap_or_else(|| Path::new("."));
    let copy_failed = |e: io::Error| MoveError::CopyFailed {
        path: source.to_path_buf(),
        message: e.to_string(),
    };

    let mut reader = File::open(source).map_err(|e| MoveError::from_io(source, e))?;
    let permissions = reader
        .metadata()
        .map_err(|e| MoveError::from_io(source, e))?
        .permissions();

    // Dropping `staged` on any early return removes the partial copy
    let mut staged = tempfile::Builder::new()
        .prefix(".quarantine-")
        .suffix(".partial")
        .tempfile_in(staging_dir)
        .map_err(|e| MoveError::from_io(staging_dir, e))?;

    io::copy(&mut reader, staged.as_file_mut()).map_err(copy_failed)?;
    staged.as_file().sync_all().map_err(copy_failed)?;

    if let Err(e) = staged
        .as_file()
        .set_times(FileTimes::new().set_modified(mtime))
    {
        log::debug!("Could not keep mtime for {}: {}", destination.display(), e);
    }
    if let Err(e) = fs::set_permissions(staged.path(), permissions) {
        log::debug!("Could not keep permissions for {}: {}", destination.display(), e);
    }

    staged.persist_noclobber(destination).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            MoveError::DestinationExists(destination.to_path_buf())
        } else {
            copy_failed(e.error)
        }
    })?;

    if let Err(e) = fs::remove_file(source) {
        // Roll back so the duplicate exists exactly once
        if let Err(cleanup) = fs::remove_file(destination) {
            log::error!(
                "Could not remove copy {} after failed move: {}",
                destination.display(),
                cleanup
            );
        }
        return Err(MoveError::from_io(source, e));
    }

    Ok(())
}
