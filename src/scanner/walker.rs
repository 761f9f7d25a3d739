//! Directory walker implementation using jwalk.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory
//! tree and collecting [`FileRecord`]s for duplicate detection.
//!
//! # Features
//!
//! - Children sorted by name in every directory for deterministic output
//! - Excluded directories are pruned before descent (hidden, cache, bundle,
//!   quarantine), see [`ExclusionPolicy`](super::ExclusionPolicy)
//! - Sentinel and hidden files are dropped
//! - Zero-byte files are yielded like any other unless `skip_empty` is set
//! - Symbolic links are neither followed nor yielded
//! - Errors are yielded per entry and never stop the walk
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use dupequarantine::scanner::{ExclusionPolicy, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let root = Path::new("/home/user/Pictures");
//! let policy = ExclusionPolicy::default().with_quarantine_dir(root.join("Quarantined"));
//! let walker = Walker::new(root, WalkerConfig::new(policy));
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::SystemTime;

use jwalk::WalkDir;

use super::{FileRecord, ScanError, WalkerConfig};
use crate::progress::ProgressCallback;

/// Directory walker for file discovery.
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional progress callback, notified once per yielded file
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            progress_callback: None,
        }
    }

    /// Report each discovered file to `callback`.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.config
            .shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// jwalk traversal with sorted children and excluded directories pruned.
    fn walk_dir(&self) -> WalkDir {
        let policy = Arc::new(self.config.policy.clone());

        WalkDir::new(&self.root)
            .follow_links(false)
            .skip_hidden(false)
            .process_read_dir(move |_depth, _path, _read_dir_state, children| {
                // Sort children for deterministic output
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });

                // Prune excluded directories before jwalk descends into them
                children.retain(|child| {
                    let Ok(entry) = child else { return true };
                    if !entry.file_type().is_dir() {
                        return true;
                    }
                    let name = entry.file_name().to_string_lossy();
                    match policy.dir_exclusion(&name, &entry.path()) {
                        Some(reason) => {
                            log::debug!("Skipping {} ({})", entry.path().display(), reason);
                            false
                        }
                        None => true,
                    }
                });
            })
    }

    /// Count the files a [`walk`](Self::walk) would yield, without building
    /// records.
    ///
    /// Used to give the walk phase a progress total. Unreadable entries are
    /// not counted and the tree may change before the real walk, so the
    /// result is an estimate. Returns early on shutdown.
    #[must_use]
    pub fn count_candidates(&self) -> usize {
        let mut count = 0;
        for entry in self.walk_dir().into_iter().flatten() {
            if self.is_shutdown_requested() {
                break;
            }
            let file_type = entry.file_type();
            if file_type.is_dir() || file_type.is_symlink() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if self.config.policy.file_exclusion(&name, &entry.path()).is_some() {
                continue;
            }
            if self.config.skip_empty && entry.metadata().is_ok_and(|m| m.len() == 0) {
                continue;
            }
            count += 1;
        }
        log::debug!("Counted {} candidate files under {}", count, self.root.display());
        count
    }

    /// Walk the directory tree, yielding file records.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration. The sequence is finite and not restartable; call `walk`
    /// again for a fresh pass.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileRecord, ScanError>> + '_ {
        let mut discovered = 0usize;

        self.walk_dir().into_iter().filter_map(move |entry_result| {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            let mut entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    return Some(Err(self.handle_jwalk_error(path, e)));
                }
            };

            let path = entry.path();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                if let Some(e) = entry.read_children_error.take() {
                    return Some(Err(self.handle_jwalk_error(path, e)));
                }
                return None;
            }

            if file_type.is_symlink() {
                log::trace!("Skipping symlink: {}", path.display());
                return None;
            }

            let name = entry.file_name().to_string_lossy();
            if let Some(reason) = self.config.policy.file_exclusion(&name, &path) {
                log::trace!("Skipping {} ({})", path.display(), reason);
                return None;
            }

            let record = self.process_file_entry(path)?;
            if let Ok(ref file) = record {
                discovered += 1;
                if let Some(ref callback) = self.progress_callback {
                    callback.on_progress(discovered, file.path.to_string_lossy().as_ref());
                }
            }
            Some(record)
        })
    }

    /// Stat a candidate file and build its record.
    fn process_file_entry(&self, path: PathBuf) -> Option<Result<FileRecord, ScanError>> {
        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => return Some(Err(self.handle_io_error(&path, e))),
        };

        if !metadata.is_file() {
            return None;
        }

        let size = metadata.len();
        if size == 0 && self.config.skip_empty {
            log::debug!("Skipping empty file: {}", path.display());
            return None;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        Some(Ok(FileRecord::new(path, size, modified)))
    }

    /// Handle I/O errors during file access.
    fn handle_io_error(&self, path: &Path, error: io::Error) -> ScanError {
        match error.kind() {
            io::ErrorKind::PermissionDenied => log::warn!("Permission denied: {}", path.display()),
            io::ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
            }
            _ => log::warn!("I/O error for {}: {}", path.display(), error),
        }
        ScanError::from_io(path, error)
    }

    /// Handle jwalk errors, keeping the underlying I/O error kind.
    fn handle_jwalk_error(&self, path: PathBuf, error: jwalk::Error) -> ScanError {
        log::warn!("Walker error for {}: {}", path.display(), error);
        let kind = error
            .io_error()
            .map_or(io::ErrorKind::Other, std::io::Error::kind);
        ScanError::from_io(&path, io::Error::new(kind, error.to_string()))
    }
}
