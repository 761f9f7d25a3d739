//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file grouping (Phase 1)
//! - Partial digest comparison within a size group (Phase 2)
//! - Full digest confirmation (Phase 3)
//!
//! The output is a list of [`DuplicatePair`]s, each naming a file to
//! quarantine and the original it duplicates.

pub mod classifier;
pub mod groups;

use crate::scanner::FileRecord;

pub use classifier::{ClassifyStats, Classifier, ClassifierConfig};
pub use groups::{group_by_size, GroupingStats, SizeGroup};

/// A confirmed duplicate and the original it was matched against.
///
/// Several pairs may share one original. An original never appears as the
/// `duplicate` of another pair from the same run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePair {
    /// Later file with the same content; this one gets quarantined
    pub duplicate: FileRecord,
    /// First file seen with this content; left in place
    pub original: FileRecord,
}

impl DuplicatePair {
    /// Create a new pair.
    #[must_use]
    pub fn new(duplicate: FileRecord, original: FileRecord) -> Self {
        Self {
            duplicate,
            original,
        }
    }

    /// Size of the duplicate in bytes.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.duplicate.size
    }
}
