//! BLAKE3 file hasher with prefix and streaming support.
//!
//! # Overview
//!
//! The [`Hasher`] computes two fingerprints per file:
//!
//! - [`Hasher::prehash`]: digest of at most the first
//!   [`PARTIAL_DIGEST_SIZE`] bytes. Only used as a cheap pre-filter, so
//!   collisions here merely cause a full digest to be computed.
//! - [`Hasher::full_hash`]: digest of the whole file, read in
//!   [`CHUNK_SIZE`] chunks. Two files with equal full digests are treated as
//!   identical without a byte comparison.
//!
//! Both use BLAKE3 and return a 32-byte [`Digest`].
//!
//! # Example
//!
//! ```no_run
//! use dupequarantine::scanner::{digest_to_hex, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let digest = hasher.full_hash(Path::new("photo.jpg")).unwrap();
//! println!("{}", digest_to_hex(&digest));
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::HashError;

/// A 256-bit content digest.
pub type Digest = [u8; 32];

/// Default number of leading bytes covered by the partial digest.
pub const PARTIAL_DIGEST_SIZE: usize = 1024;

/// Read buffer size for streaming full digests.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Files at or above this size are hashed through a memory map when enabled.
pub const DEFAULT_MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Computes partial and full digests of files.
#[derive(Debug, Clone)]
pub struct Hasher {
    prefix_bytes: usize,
    use_mmap: bool,
    mmap_threshold: u64,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default prefix size and mmap enabled for
    /// large files.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prefix_bytes: PARTIAL_DIGEST_SIZE,
            use_mmap: true,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
            shutdown_flag: None,
        }
    }

    /// Number of leading bytes read by [`Hasher::prehash`].
    #[must_use]
    pub fn with_prefix_bytes(mut self, bytes: usize) -> Self {
        self.prefix_bytes = bytes.max(1);
        self
    }

    /// Enable or disable memory-mapped hashing.
    #[must_use]
    pub fn with_mmap(mut self, enabled: bool) -> Self {
        self.use_mmap = enabled;
        self
    }

    /// Minimum file size for memory-mapped hashing.
    #[must_use]
    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.mmap_threshold = threshold;
        self
    }

    /// Abort streaming between chunks once this flag is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Configured prefix size.
    #[must_use]
    pub fn prefix_bytes(&self) -> usize {
        self.prefix_bytes
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Digest of at most the first `prefix_bytes` of the file.
    ///
    /// For files no longer than the prefix this equals [`Hasher::full_hash`].
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn prehash(&self, path: &Path) -> Result<Digest, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;

        let mut buffer = Vec::with_capacity(self.prefix_bytes);
        file.take(self.prefix_bytes as u64)
            .read_to_end(&mut buffer)
            .map_err(|e| HashError::from_io(path, e))?;

        Ok(*blake3::hash(&buffer).as_bytes())
    }

    /// Digest of the entire file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read, or
    /// [`HashError::Interrupted`] if shutdown was requested mid-stream.
    pub fn full_hash(&self, path: &Path) -> Result<Digest, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;

        if self.use_mmap {
            let len = file
                .metadata()
                .map_err(|e| HashError::from_io(path, e))?
                .len();
            if len >= self.mmap_threshold && len > 0 {
                let mut hasher = blake3::Hasher::new();
                match hasher.update_mmap(path) {
                    Ok(_) => return Ok(*hasher.finalize().as_bytes()),
                    Err(e) => {
                        log::debug!(
                            "Memory map failed for {}, streaming instead: {}",
                            path.display(),
                            e
                        );
                    }
                }
            }
        }

        self.stream(&mut file, path)
    }

    fn stream(&self, file: &mut File, path: &Path) -> Result<Digest, HashError> {
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Interrupted(path.to_path_buf()));
            }
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&buffer[..read]);
        }

        Ok(*hasher.finalize().as_bytes())
    }
}

/// Render a digest as 64 lowercase hex characters.
#[must_use]
pub fn digest_to_hex(digest: &Digest) -> String {
    blake3::Hash::from(*digest).to_hex().to_string()
}
