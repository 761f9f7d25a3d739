use dupequarantine::scanner::{ExclusionPolicy, Walker, WalkerConfig};
use dupequarantine::{run_scan, RunOptions, QUARANTINE_DIR_NAME};
use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::tempdir;

fn no_shutdown() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[test]
fn test_quarantine_directory_is_never_scanned() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let quarantine = root.join(QUARANTINE_DIR_NAME);
    fs::create_dir(&quarantine).unwrap();
    // A copy already sitting in quarantine must not make the live file a duplicate
    fs::write(quarantine.join("photo.jpg"), "same bytes").unwrap();
    fs::write(root.join("photo.jpg"), "same bytes").unwrap();

    let report = run_scan(&root, &RunOptions::default(), no_shutdown(), None);

    assert_eq!(report.summary.files_scanned, 1);
    assert_eq!(report.summary.duplicate_pairs, 0);
    assert!(root.join("photo.jpg").exists());
}

#[test]
fn test_excluded_entries_are_never_quarantined() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("visible.txt"), "shared").unwrap();

    fs::write(root.join(".hidden.txt"), "shared").unwrap();
    for sub in [".git", "__pycache__", "Media Cache Files", "Tool.app"] {
        fs::create_dir(root.join(sub)).unwrap();
        fs::write(root.join(sub).join("copy.txt"), "shared").unwrap();
    }
    fs::write(root.join("Thumbs.db"), "shared").unwrap();

    let report = run_scan(&root, &RunOptions::default(), no_shutdown(), None);

    assert_eq!(report.summary.files_scanned, 1);
    assert_eq!(report.summary.duplicate_pairs, 0);
    assert!(!root.join(QUARANTINE_DIR_NAME).exists());
}

#[test]
fn test_custom_policy_through_run_options() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir(root.join("node_modules")).unwrap();
    fs::write(root.join("node_modules/lib.js"), "code").unwrap();
    fs::write(root.join("lib.js"), "code").unwrap();

    let options =
        RunOptions::default().with_policy(ExclusionPolicy::default().with_excluded_dir("node_modules"));
    let report = run_scan(&root, &options, no_shutdown(), None);

    assert_eq!(report.summary.duplicate_pairs, 0);

    let report = run_scan(&root, &RunOptions::default(), no_shutdown(), None);
    assert_eq!(report.summary.duplicate_pairs, 1);
}

#[test]
fn test_walk_order_is_stable_across_runs() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    for name in ["zeta", "alpha", "mid", "Beta"] {
        fs::create_dir(root.join(name)).unwrap();
        fs::write(root.join(name).join("f.txt"), name).unwrap();
    }

    let walk = || -> Vec<_> {
        Walker::new(&root, WalkerConfig::default())
            .walk()
            .filter_map(Result::ok)
            .map(|r| r.path)
            .collect()
    };

    let first = walk();
    assert_eq!(first.len(), 4);
    assert_eq!(first, walk());
}

#[test]
#[cfg(unix)]
fn test_symlinked_duplicate_is_not_quarantined() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("real.txt"), "linked").unwrap();
    std::os::unix::fs::symlink(root.join("real.txt"), root.join("alias.txt")).unwrap();

    let report = run_scan(&root, &RunOptions::default(), no_shutdown(), None);

    assert_eq!(report.summary.files_scanned, 1);
    assert_eq!(report.summary.duplicate_pairs, 0);
    assert!(root.join("alias.txt").symlink_metadata().is_ok());
}
