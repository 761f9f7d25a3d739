//! Staged duplicate classifier.
//!
//! # Overview
//!
//! Records go through three filters, each more expensive than the last:
//!
//! 1. **Size**: [`group_by_size`] drops every file whose size is unique.
//! 2. **Partial digest**: the first [`PARTIAL_DIGEST_SIZE`] bytes of every
//!    member of a size group are digested. Members whose prefix digest is
//!    not shared with anyone else in the group are done.
//! 3. **Full digest**: every member of a shared prefix bucket, the first one
//!    included, is digested in full. The first record seen for a full digest
//!    becomes the original; each later one is paired with it.
//!
//! Digests are computed on a bounded rayon pool. Results are collected back
//! in enumeration order before any map is touched, so the pairs come out in
//! the same order on every run: ascending size, then walk order.
//!
//! # Example
//!
//! ```no_run
//! use dupequarantine::duplicates::{Classifier, ClassifierConfig};
//! use dupequarantine::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let records = walker
//!     .walk()
//!     .filter_map(Result::ok);
//! let classifier = Classifier::new(ClassifierConfig::default());
//! let (pairs, stats) = classifier.classify(records);
//! println!("{} duplicates, {} hash failures", pairs.len(), stats.hash_failures);
//! ```
//!
//! [`PARTIAL_DIGEST_SIZE`]: crate::scanner::PARTIAL_DIGEST_SIZE

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::groups::{group_by_size, GroupingStats, SizeGroup};
use super::DuplicatePair;
use crate::progress::{ProgressCallback, PHASE_CLASSIFY};
use crate::scanner::{digest_to_hex, Digest, FileRecord, HashError, Hasher, PARTIAL_DIGEST_SIZE};

/// Default number of digesting threads.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Configuration for the classifier.
#[derive(Clone)]
pub struct ClassifierConfig {
    /// Number of threads digesting files concurrently
    pub io_threads: usize,
    /// Bytes covered by the partial digest
    pub prefix_bytes: usize,
    /// Memory-map large files for the full digest
    pub use_mmap: bool,
    /// Optional shutdown flag, checked between size groups
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback, notified once per size group
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("io_threads", &self.io_threads)
            .field("prefix_bytes", &self.prefix_bytes)
            .field("use_mmap", &self.use_mmap)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            prefix_bytes: PARTIAL_DIGEST_SIZE,
            use_mmap: true,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl ClassifierConfig {
    /// Set the number of digesting threads (at least one).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the number of bytes covered by the partial digest.
    #[must_use]
    pub fn with_prefix_bytes(mut self, bytes: usize) -> Self {
        self.prefix_bytes = bytes;
        self
    }

    /// Enable or disable memory-mapped full digests.
    #[must_use]
    pub fn with_mmap(mut self, enabled: bool) -> Self {
        self.use_mmap = enabled;
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

/// Statistics from a classification run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifyStats {
    /// Size grouping statistics
    pub grouping: GroupingStats,
    /// Size groups fully classified
    pub groups_processed: usize,
    /// Partial digests computed
    pub partial_digests: usize,
    /// Full digests computed
    pub full_digests: usize,
    /// Files excluded because they could not be read
    pub hash_failures: usize,
    /// Paths of the files counted in `hash_failures`
    pub failed_paths: Vec<PathBuf>,
    /// Number of pairs emitted
    pub duplicate_pairs: usize,
    /// Bytes held by the duplicates
    pub duplicate_bytes: u64,
    /// Classification stopped early on shutdown
    pub interrupted: bool,
}

impl ClassifyStats {
    fn record_failure(&mut self, error: &HashError) {
        self.hash_failures += 1;
        self.failed_paths.push(error.path().to_path_buf());
    }
}

/// Outcome of digesting one group member.
enum Digested {
    Done(Digest),
    Failed(HashError),
    Interrupted,
}

impl From<Result<Digest, HashError>> for Digested {
    fn from(result: Result<Digest, HashError>) -> Self {
        match result {
            Ok(digest) => Self::Done(digest),
            Err(HashError::Interrupted(_)) => Self::Interrupted,
            Err(e) => Self::Failed(e),
        }
    }
}

/// The staged size, partial digest, full digest classifier.
pub struct Classifier {
    config: ClassifierConfig,
    hasher: Hasher,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("config", &self.config)
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

impl Classifier {
    /// Create a classifier with its own digesting pool.
    ///
    /// If the pool cannot be created the classifier digests sequentially on
    /// the calling thread.
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        let mut hasher = Hasher::new()
            .with_prefix_bytes(config.prefix_bytes)
            .with_mmap(config.use_mmap);
        if let Some(ref flag) = config.shutdown_flag {
            hasher = hasher.with_shutdown_flag(Arc::clone(flag));
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(config.io_threads.max(1))
            .thread_name(|i| format!("digest-{i}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!("Failed to create digest thread pool, hashing sequentially: {e}");
                None
            }
        };

        Self {
            config,
            hasher,
            pool,
        }
    }

    /// Create a classifier with default settings.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ClassifierConfig::default())
    }

    /// Classify `records` and return the duplicate pairs in discovery order.
    ///
    /// Records that cannot be read are logged, counted in
    /// [`ClassifyStats::hash_failures`] and take no further part; the rest of
    /// their group is still classified.
    pub fn classify(
        &self,
        records: impl IntoIterator<Item = FileRecord>,
    ) -> (Vec<DuplicatePair>, ClassifyStats) {
        self.classify_with(
            records,
            |h, f| h.prehash(&f.path),
            |h, f| h.full_hash(&f.path),
        )
    }

    /// Classify with explicit partial and full digest functions.
    fn classify_with<P, F>(
        &self,
        records: impl IntoIterator<Item = FileRecord>,
        partial: P,
        full: F,
    ) -> (Vec<DuplicatePair>, ClassifyStats)
    where
        P: Fn(&Hasher, &FileRecord) -> Result<Digest, HashError> + Sync,
        F: Fn(&Hasher, &FileRecord) -> Result<Digest, HashError> + Sync,
    {
        let (groups, grouping) = group_by_size(records);
        let mut stats = ClassifyStats {
            grouping,
            ..ClassifyStats::default()
        };
        let mut pairs = Vec::new();
        let mut originals: HashMap<Digest, FileRecord> = HashMap::new();

        let total = groups.len();
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(PHASE_CLASSIFY, total);
        }
        log::info!("Phase 2: Classifying {} size groups", total);

        for (idx, group) in groups.into_iter().enumerate() {
            if self.config.is_shutdown_requested() {
                stats.interrupted = true;
                break;
            }

            let label = group
                .files
                .first()
                .map(|f| f.path.to_string_lossy().into_owned())
                .unwrap_or_default();

            let done = self.classify_group(
                group,
                (&partial, &full),
                &mut originals,
                &mut pairs,
                &mut stats,
            );
            if !done {
                stats.interrupted = true;
                break;
            }
            stats.groups_processed += 1;

            if let Some(ref callback) = self.config.progress_callback {
                callback.on_progress(idx + 1, &label);
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_CLASSIFY);
        }

        stats.duplicate_pairs = pairs.len();
        stats.duplicate_bytes = pairs.iter().map(DuplicatePair::bytes).sum();

        if stats.interrupted {
            log::info!("Classification interrupted by shutdown signal");
        }
        log::info!(
            "Phase 3 complete: {} duplicates ({} partial, {} full digests, {} failures)",
            stats.duplicate_pairs,
            stats.partial_digests,
            stats.full_digests,
            stats.hash_failures
        );

        (pairs, stats)
    }

    /// Classify one size group. Returns `false` if interrupted.
    fn classify_group<P, F>(
        &self,
        group: SizeGroup,
        (partial, full): (&P, &F),
        originals: &mut HashMap<Digest, FileRecord>,
        pairs: &mut Vec<DuplicatePair>,
        stats: &mut ClassifyStats,
    ) -> bool
    where
        P: Fn(&Hasher, &FileRecord) -> Result<Digest, HashError> + Sync,
        F: Fn(&Hasher, &FileRecord) -> Result<Digest, HashError> + Sync,
    {
        let mut files = group.files;

        // Partial digests, bucketed by digest in first-seen order
        let partials = self.digest_all(&files, partial);
        let mut bucket_of: HashMap<Digest, usize> = HashMap::new();
        let mut buckets: Vec<Vec<usize>> = Vec::new();

        for (i, outcome) in partials.into_iter().enumerate() {
            match outcome {
                Digested::Done(digest) => {
                    stats.partial_digests += 1;
                    files[i].partial = Some(digest);
                    let slot = *bucket_of.entry(digest).or_insert_with(|| {
                        buckets.push(Vec::new());
                        buckets.len() - 1
                    });
                    buckets[slot].push(i);
                }
                Digested::Failed(e) => {
                    log::warn!("Failed to hash {}: {}", files[i].path.display(), e);
                    stats.record_failure(&e);
                }
                Digested::Interrupted => return false,
            }
        }

        // Every member of a shared bucket needs a full digest, the
        // representative included.
        let mut escalated: Vec<usize> = buckets
            .into_iter()
            .filter(|bucket| bucket.len() > 1)
            .flatten()
            .collect();
        if escalated.is_empty() {
            return true;
        }
        escalated.sort_unstable();

        let candidates: Vec<FileRecord> = escalated.iter().map(|&i| files[i].clone()).collect();
        let fulls = self.digest_all(&candidates, full);

        for (mut record, outcome) in candidates.into_iter().zip(fulls) {
            match outcome {
                Digested::Done(digest) => {
                    stats.full_digests += 1;
                    record.full = Some(digest);
                    match originals.get(&digest) {
                        Some(original) => {
                            log::debug!(
                                "Duplicate: {} matches {} ({})",
                                record.path.display(),
                                original.path.display(),
                                digest_to_hex(&digest)
                            );
                            pairs.push(DuplicatePair::new(record, original.clone()));
                        }
                        None => {
                            originals.insert(digest, record);
                        }
                    }
                }
                Digested::Failed(e) => {
                    log::warn!("Failed to hash {}: {}", record.path.display(), e);
                    stats.record_failure(&e);
                }
                Digested::Interrupted => return false,
            }
        }

        true
    }

    /// Digest every record, returning outcomes in input order.
    fn digest_all<F>(&self, files: &[FileRecord], digest: F) -> Vec<Digested>
    where
        F: Fn(&Hasher, &FileRecord) -> Result<Digest, HashError> + Sync,
    {
        let hasher = &self.hasher;
        match self.pool {
            Some(ref pool) => pool.install(|| {
                files
                    .par_iter()
                    .map(|f| Digested::from(digest(hasher, f)))
                    .collect()
            }),
            None => files
                .iter()
                .map(|f| Digested::from(digest(hasher, f)))
                .collect(),
        }
    }
}
