//! Bucketing of scanned files by byte size.
//!
//! Two files can only hold the same bytes if their lengths match, so this
//! is where most of the tree drops out before any file is opened. A size
//! held by one file alone is counted in [`GroupingStats::eliminated_unique`]
//! and forgotten.
//!
//! [`group_by_size`] returns the remaining buckets smallest first. Inside a
//! bucket the walker's order is untouched; the classifier relies on it to
//! pick which copy stays.
//!
//! # Example
//!
//! ```
//! use dupequarantine::scanner::FileRecord;
//! use dupequarantine::duplicates::group_by_size;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/file1.txt"), 1024, SystemTime::now()),
//!     FileRecord::new(PathBuf::from("/file2.txt"), 1024, SystemTime::now()),
//!     FileRecord::new(PathBuf::from("/file3.txt"), 2048, SystemTime::now()),
//! ];
//!
//! let (groups, stats) = group_by_size(files);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].size, 1024);
//! ```

use std::collections::BTreeMap;

use crate::scanner::FileRecord;

/// Candidate files of one byte size, kept in the order the walker found them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeGroup {
    pub size: u64,
    /// Two or more records, all of `size` bytes
    pub files: Vec<FileRecord>,
}

/// Counters collected while bucketing by size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Records offered
    pub total_files: usize,
    /// Sum of their sizes
    pub total_size: u64,
    /// Distinct sizes seen, singletons included
    pub unique_sizes: usize,
    /// Records in buckets of two or more
    pub potential_duplicates: usize,
    /// Records alone at their size
    pub eliminated_unique: usize,
    pub empty_files: usize,
    /// Buckets handed on to the classifier
    pub duplicate_groups: usize,
}

impl GroupingStats {
    /// Share of records dropped at this stage, as a percentage.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        match self.total_files {
            0 => 0.0,
            n => self.eliminated_unique as f64 * 100.0 / n as f64,
        }
    }
}

/// Group files by exact size, discarding sizes held by a single file.
///
/// Returns the candidate groups in ascending size order together with
/// statistics. Zero-byte files are grouped like any other size; the walker
/// decides whether they are offered at all.
pub fn group_by_size(
    files: impl IntoIterator<Item = FileRecord>,
) -> (Vec<SizeGroup>, GroupingStats) {
    let mut by_size: BTreeMap<u64, Vec<FileRecord>> = BTreeMap::new();
    let mut stats = GroupingStats::default();

    for file in files {
        stats.total_files += 1;
        stats.total_size += file.size;
        if file.size == 0 {
            stats.empty_files += 1;
        }
        by_size.entry(file.size).or_default().push(file);
    }

    stats.unique_sizes = by_size.len();

    let mut groups = Vec::new();
    for (size, files) in by_size {
        if files.len() == 1 {
            stats.eliminated_unique += 1;
            log::trace!("Eliminated unique size {}: {}", size, files[0].path.display());
            continue;
        }
        stats.potential_duplicates += files.len();
        stats.duplicate_groups += 1;
        log::debug!("Size group {} bytes: {} candidates", size, files.len());
        groups.push(SizeGroup { size, files });
    }

    log::info!(
        "Phase 1 complete: {} files, {} candidate groups, {} eliminated ({:.1}%)",
        stats.total_files,
        stats.duplicate_groups,
        stats.eliminated_unique,
        stats.elimination_rate()
    );

    (groups, stats)
}
