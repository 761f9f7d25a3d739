use dupequarantine::{run_scan, RunOptions, QUARANTINE_DIR_NAME};
use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::tempdir;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Returns true when permission bits are not enforced (e.g. running as root).
#[cfg(unix)]
fn permissions_ignored(path: &std::path::Path) -> bool {
    fs::read(path).is_ok()
}

#[test]
#[cfg(unix)]
fn test_unreadable_file_beside_duplicates() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("a.txt"), "same").unwrap();
    fs::write(root.join("b.txt"), "same").unwrap();
    let locked = root.join("locked.txt");
    fs::write(&locked, "same").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if permissions_ignored(&locked) {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        eprintln!("skipping: permission bits not enforced for this user");
        return;
    }

    let report = run_scan(
        &root,
        &RunOptions::default(),
        Arc::new(AtomicBool::new(false)),
        None,
    );

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(report.summary.hash_errors, 1);
    assert_eq!(report.summary.duplicate_pairs, 1);
    assert_eq!(report.summary.moves_succeeded, 1);
    assert!(root.join("a.txt").exists());
    assert!(root.join(QUARANTINE_DIR_NAME).join("b.txt").exists());
    assert!(locked.exists());
}

#[test]
#[cfg(unix)]
fn test_unreadable_directory_does_not_stop_walk() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let sealed = root.join("sealed");
    fs::create_dir(&sealed).unwrap();
    fs::write(sealed.join("inner.txt"), "dup").unwrap();
    fs::write(root.join("a.txt"), "dup").unwrap();
    fs::write(root.join("b.txt"), "dup").unwrap();
    fs::set_permissions(&sealed, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::read_dir(&sealed).is_ok() {
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();
        eprintln!("skipping: permission bits not enforced for this user");
        return;
    }

    let report = run_scan(
        &root,
        &RunOptions::default(),
        Arc::new(AtomicBool::new(false)),
        None,
    );

    fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(report.summary.enumeration_errors >= 1);
    assert_eq!(report.summary.files_scanned, 2);
    assert_eq!(report.summary.duplicate_pairs, 1);
    assert!(sealed.join("inner.txt").exists());
}

#[test]
fn test_interrupted_run_moves_nothing() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("a.txt"), "dup").unwrap();
    fs::write(root.join("b.txt"), "dup").unwrap();

    let report = run_scan(
        &root,
        &RunOptions::default(),
        Arc::new(AtomicBool::new(true)),
        None,
    );

    assert!(report.summary.interrupted);
    assert_eq!(report.summary.moves_succeeded, 0);
    assert!(root.join("b.txt").exists());
}
