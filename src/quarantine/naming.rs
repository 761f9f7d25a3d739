//! Collision-free destination names inside the quarantine directory.
//!
//! Duplicates are placed flat, by base name. When that name is taken the
//! smallest free index is appended to the stem: `photo.jpg`, `photo_1.jpg`,
//! `photo_2.jpg`, ... Names without an extension become `notes_1`, and so on.
//! The choice depends only on which names already exist, so it is the same
//! for the same directory state.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Whether anything (file, directory, dangling link) occupies `path`.
#[must_use]
pub fn is_occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Candidate name for collision index `index` (0 means the name itself).
#[must_use]
pub fn indexed_name(file_name: &OsStr, index: u64) -> OsString {
    if index == 0 {
        return file_name.to_os_string();
    }

    let as_path = Path::new(file_name);
    let stem = as_path.file_stem().unwrap_or(file_name);
    let mut name = stem.to_os_string();
    name.push(format!("_{index}"));
    if let Some(ext) = as_path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

/// First free destination for `file_name` in `dir`, consulting the
/// filesystem only.
#[must_use]
pub fn unique_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    unique_destination_with(dir, file_name, |_| false)
}

/// First free destination for `file_name` in `dir`.
///
/// A candidate is taken if it exists on disk or `reserved` says so. Dry runs
/// use `reserved` to keep planned names apart without creating anything.
pub fn unique_destination_with<F>(dir: &Path, file_name: &OsStr, reserved: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let mut index = 0u64;
    loop {
        let candidate = dir.join(indexed_name(file_name, index));
        if !is_occupied(&candidate) && !reserved(&candidate) {
            return candidate;
        }
        index += 1;
    }
}
