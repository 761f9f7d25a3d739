//! Exclusion rules for the tree walker.
//!
//! The rules are plain data so they can be swapped or tested without walking
//! a real tree. [`ExclusionPolicy::default`] reproduces the classic rules of
//! the tool: hidden entries, a couple of cache directories, `.app` bundles
//! and OS sentinel files are all left alone.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Why an entry was left out of the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// Name starts with the hidden-entry marker.
    Hidden,
    /// Directory name is a known cache directory.
    CacheDirectory,
    /// Directory name ends with an application bundle suffix.
    Bundle,
    /// Entry is the quarantine directory or lies inside it.
    Quarantine,
    /// File is an OS-generated sentinel file.
    Sentinel,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Hidden => "hidden",
            Self::CacheDirectory => "cache directory",
            Self::Bundle => "application bundle",
            Self::Quarantine => "quarantine directory",
            Self::Sentinel => "system sentinel file",
        };
        f.write_str(s)
    }
}

/// Directory and file exclusion rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionPolicy {
    /// Marker prefix for hidden entries (e.g. `.`). Empty disables the rule.
    pub hidden_prefix: String,
    /// Directory names that are never descended into.
    pub excluded_dir_names: BTreeSet<String>,
    /// Directory name suffixes marking opaque bundles (e.g. `.app`).
    pub bundle_suffixes: Vec<String>,
    /// File names generated by the OS (volume metadata, thumbnail caches).
    pub sentinel_files: BTreeSet<String>,
    /// The quarantine directory; it and everything below it is skipped.
    pub quarantine_dir: Option<PathBuf>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            hidden_prefix: ".".to_string(),
            excluded_dir_names: ["Media Cache Files", "__pycache__"]
                .into_iter()
                .map(String::from)
                .collect(),
            bundle_suffixes: vec![".app".to_string()],
            sentinel_files: [".DS_Store", "Thumbs.db", "desktop.ini"]
                .into_iter()
                .map(String::from)
                .collect(),
            quarantine_dir: None,
        }
    }
}

impl ExclusionPolicy {
    /// A policy that excludes nothing.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            hidden_prefix: String::new(),
            excluded_dir_names: BTreeSet::new(),
            bundle_suffixes: Vec::new(),
            sentinel_files: BTreeSet::new(),
            quarantine_dir: None,
        }
    }

    /// Set the quarantine directory to skip.
    #[must_use]
    pub fn with_quarantine_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.quarantine_dir = Some(dir.into());
        self
    }

    /// Add a cache directory name.
    #[must_use]
    pub fn with_excluded_dir(mut self, name: impl Into<String>) -> Self {
        self.excluded_dir_names.insert(name.into());
        self
    }

    /// Add a sentinel file name.
    #[must_use]
    pub fn with_sentinel_file(mut self, name: impl Into<String>) -> Self {
        self.sentinel_files.insert(name.into());
        self
    }

    fn is_hidden(&self, name: &str) -> bool {
        !self.hidden_prefix.is_empty() && name.starts_with(&self.hidden_prefix)
    }

    /// Whether `path` is the quarantine directory or lies inside it.
    #[must_use]
    pub fn is_quarantined(&self, path: &Path) -> bool {
        self.quarantine_dir
            .as_deref()
            .is_some_and(|q| path.starts_with(q))
    }

    /// Reason a directory must not be descended into, if any.
    #[must_use]
    pub fn dir_exclusion(&self, name: &str, path: &Path) -> Option<ExclusionReason> {
        if self.is_quarantined(path) {
            Some(ExclusionReason::Quarantine)
        } else if self.is_hidden(name) {
            Some(ExclusionReason::Hidden)
        } else if self.excluded_dir_names.contains(name) {
            Some(ExclusionReason::CacheDirectory)
        } else if self
            .bundle_suffixes
            .iter()
            .any(|suffix| !suffix.is_empty() && name.ends_with(suffix.as_str()))
        {
            Some(ExclusionReason::Bundle)
        } else {
            None
        }
    }

    /// Reason a file must be left out, if any.
    #[must_use]
    pub fn file_exclusion(&self, name: &str, path: &Path) -> Option<ExclusionReason> {
        if self.is_quarantined(path) {
            Some(ExclusionReason::Quarantine)
        } else if self.sentinel_files.contains(name) {
            Some(ExclusionReason::Sentinel)
        } else if self.is_hidden(name) {
            Some(ExclusionReason::Hidden)
        } else {
            None
        }
    }

    /// Shorthand for `dir_exclusion(..).is_some()`.
    #[must_use]
    pub fn excludes_dir(&self, name: &str, path: &Path) -> bool {
        self.dir_exclusion(name, path).is_some()
    }

    /// Shorthand for `file_exclusion(..).is_some()`.
    #[must_use]
    pub fn excludes_file(&self, name: &str, path: &Path) -> bool {
        self.file_exclusion(name, path).is_some()
    }
}
