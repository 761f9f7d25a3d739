use dupequarantine::duplicates::{Classifier, DuplicatePair};
use dupequarantine::quarantine::{MoveConfig, QuarantineMover};
use dupequarantine::scanner::{ExclusionPolicy, Walker, WalkerConfig};
use dupequarantine::{run_scan, RunOptions, QUARANTINE_DIR_NAME};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::tempdir;

fn classify(root: &Path) -> Vec<DuplicatePair> {
    let policy = ExclusionPolicy::default().with_quarantine_dir(root.join(QUARANTINE_DIR_NAME));
    let walker = Walker::new(root, WalkerConfig::new(policy));
    let records = walker
        .walk()
        .filter_map(Result::ok);
    Classifier::with_defaults().classify(records).0
}

fn sorted_dir(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(path)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_same_base_name_in_different_directories() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    for sub in ["2019", "2020", "2021"] {
        fs::create_dir(root.join(sub)).unwrap();
    }
    // The A_ keepers sort first, so every IMG_0001.jpg is the later copy
    fs::write(root.join("2019/IMG_0001.jpg"), "alpha").unwrap();
    fs::write(root.join("2019/A_keep_alpha.jpg"), "alpha").unwrap();
    fs::write(root.join("2020/IMG_0001.jpg"), "bravo-").unwrap();
    fs::write(root.join("2020/A_keep_bravo.jpg"), "bravo-").unwrap();
    fs::write(root.join("2021/IMG_0001.jpg"), "charlie").unwrap();
    fs::write(root.join("2021/A_keep_charlie.jpg"), "charlie").unwrap();

    let report = run_scan(
        &root,
        &RunOptions::default(),
        Arc::new(AtomicBool::new(false)),
        None,
    );

    assert_eq!(report.summary.moves_succeeded, 3);
    let quarantine = root.join(QUARANTINE_DIR_NAME);
    assert_eq!(
        sorted_dir(&quarantine),
        vec!["IMG_0001.jpg", "IMG_0001_1.jpg", "IMG_0001_2.jpg"]
    );

    let mut contents: Vec<String> = sorted_dir(&quarantine)
        .iter()
        .map(|n| fs::read_to_string(quarantine.join(n)).unwrap())
        .collect();
    contents.sort();
    assert_eq!(contents, vec!["alpha", "bravo-", "charlie"]);
}

#[test]
fn test_existing_quarantine_content_is_not_overwritten() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let quarantine = root.join(QUARANTINE_DIR_NAME);
    fs::create_dir(&quarantine).unwrap();
    fs::write(quarantine.join("notes.txt"), "from an earlier run").unwrap();

    fs::write(root.join("a_notes.txt"), "today").unwrap();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub/notes.txt"), "today").unwrap();

    let pairs = classify(&root);
    assert_eq!(pairs.len(), 1);

    let result = QuarantineMover::default().quarantine(&pairs, &quarantine);

    assert_eq!(result.success_count(), 1);
    assert_eq!(
        fs::read_to_string(quarantine.join("notes.txt")).unwrap(),
        "from an earlier run"
    );
    assert_eq!(fs::read_to_string(quarantine.join("notes_1.txt")).unwrap(), "today");
}

#[test]
fn test_touched_after_scan_is_left_alone() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("a.txt"), "stable").unwrap();
    fs::write(root.join("b.txt"), "stable").unwrap();

    let pairs = classify(&root);
    assert_eq!(pairs.len(), 1);

    // Same size, newer mtime: someone edited the file after the scan
    filetime::set_file_mtime(
        &pairs[0].duplicate.path,
        FileTime::from_unix_time(2_000_000_000, 0),
    )
    .unwrap();

    let quarantine = root.join(QUARANTINE_DIR_NAME);
    let result = QuarantineMover::default().quarantine(&pairs, &quarantine);

    assert_eq!(result.success_count(), 0);
    assert_eq!(result.failure_count(), 1);
    assert!(pairs[0].duplicate.path.exists());
    assert!(!quarantine.exists());
}

#[test]
fn test_original_removed_after_scan_keeps_duplicate() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("a.txt"), "last copy").unwrap();
    fs::write(root.join("b.txt"), "last copy").unwrap();

    let pairs = classify(&root);
    fs::remove_file(&pairs[0].original.path).unwrap();

    let result = QuarantineMover::default().quarantine(&pairs, &root.join(QUARANTINE_DIR_NAME));

    assert_eq!(result.failure_count(), 1);
    assert!(result.failures[0].1.contains("missing"));
    assert!(root.join("b.txt").exists());
}

#[test]
fn test_quarantine_root_created_with_parents() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("a.txt"), "dup").unwrap();
    fs::write(root.join("b.txt"), "dup").unwrap();

    let pairs = classify(&root);
    let nested: PathBuf = root.join("deep").join("er").join("Quarantined");
    let result = QuarantineMover::new(MoveConfig::default()).quarantine(&pairs, &nested);

    assert_eq!(result.success_count(), 1);
    assert!(nested.join("b.txt").exists());
}

#[test]
fn test_original_content_is_untouched() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("a.txt"), "precious").unwrap();
    fs::write(root.join("b.txt"), "precious").unwrap();
    let before = fs::metadata(root.join("a.txt")).unwrap().modified().unwrap();

    run_scan(
        &root,
        &RunOptions::default(),
        Arc::new(AtomicBool::new(false)),
        None,
    );

    assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "precious");
    assert_eq!(
        fs::metadata(root.join("a.txt")).unwrap().modified().unwrap(),
        before
    );
}
