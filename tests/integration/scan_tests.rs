use dupequarantine::{run_scan, RunOptions, QUARANTINE_DIR_NAME};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

fn canonical_root(dir: &TempDir) -> PathBuf {
    dir.path().canonicalize().unwrap()
}

fn run(root: &Path) -> dupequarantine::output::RunReport {
    run_scan(
        root,
        &RunOptions::default(),
        Arc::new(AtomicBool::new(false)),
        None,
    )
}

fn quarantined_names(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root.join(QUARANTINE_DIR_NAME))
        .map(|rd| {
            rd.filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let root = canonical_root(&dir);

    let report = run(&root);

    assert_eq!(report.summary.files_scanned, 0);
    assert_eq!(report.summary.duplicate_pairs, 0);
    assert!(!root.join(QUARANTINE_DIR_NAME).exists());
}

#[test]
fn test_scan_unique_files_moves_nothing() {
    let dir = tempdir().unwrap();
    let root = canonical_root(&dir);
    fs::write(root.join("a.txt"), "content a").unwrap();
    fs::write(root.join("b.txt"), "content bb").unwrap();
    fs::write(root.join("c.txt"), "content ccc").unwrap();

    let report = run(&root);

    assert_eq!(report.summary.files_scanned, 3);
    assert_eq!(report.summary.duplicate_pairs, 0);
    assert!(!root.join(QUARANTINE_DIR_NAME).exists());
}

#[test]
fn test_same_size_scenario() {
    let dir = tempdir().unwrap();
    let root = canonical_root(&dir);
    fs::write(root.join("a.txt"), "X").unwrap();
    fs::write(root.join("b.txt"), "X").unwrap();
    fs::write(root.join("c.txt"), "Y").unwrap();

    let report = run(&root);

    assert_eq!(report.summary.duplicate_pairs, 1);
    assert_eq!(report.summary.moves_succeeded, 1);

    let remaining = [root.join("a.txt"), root.join("b.txt")]
        .iter()
        .filter(|p| p.exists())
        .count();
    assert_eq!(remaining, 1);
    assert_eq!(fs::read_to_string(root.join("c.txt")).unwrap(), "Y");
    assert_eq!(quarantined_names(&root).len(), 1);
}

#[test]
fn test_first_seen_copy_stays_in_place() {
    let dir = tempdir().unwrap();
    let root = canonical_root(&dir);
    fs::write(root.join("1_original.dat"), "payload").unwrap();
    fs::write(root.join("2_copy.dat"), "payload").unwrap();
    fs::write(root.join("3_copy.dat"), "payload").unwrap();

    let report = run(&root);

    assert_eq!(report.summary.duplicate_pairs, 2);
    assert!(root.join("1_original.dat").exists());
    assert_eq!(quarantined_names(&root), vec!["2_copy.dat", "3_copy.dat"]);
    assert!(report
        .moves
        .iter()
        .all(|m| m.original.ends_with("1_original.dat")));
}

#[test]
fn test_nested_duplicates_are_found() {
    let dir = tempdir().unwrap();
    let root = canonical_root(&dir);
    let deep = root.join("one").join("two").join("three");
    fs::create_dir_all(&deep).unwrap();
    fs::write(root.join("top.bin"), "nested duplicate").unwrap();
    fs::write(deep.join("bottom.bin"), "nested duplicate").unwrap();

    let report = run(&root);

    assert_eq!(report.summary.duplicate_pairs, 1);
    assert_eq!(report.summary.moves_succeeded, 1);
}

#[test]
fn test_shared_prefix_with_different_tail_not_paired() {
    let dir = tempdir().unwrap();
    let root = canonical_root(&dir);
    let mut first = vec![0u8; 10_000];
    let second = first.clone();
    first[9_999] = 1;
    fs::write(root.join("first.bin"), &first).unwrap();
    fs::write(root.join("second.bin"), &second).unwrap();

    let report = run(&root);

    assert_eq!(report.summary.duplicate_pairs, 0);
    assert!(root.join("first.bin").exists());
    assert!(root.join("second.bin").exists());
}

#[test]
fn test_large_identical_files_are_paired() {
    let dir = tempdir().unwrap();
    let root = canonical_root(&dir);
    let content: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(root.join("big_a.bin"), &content).unwrap();
    fs::write(root.join("big_b.bin"), &content).unwrap();

    let report = run(&root);

    assert_eq!(report.summary.duplicate_pairs, 1);
    assert_eq!(report.summary.bytes_quarantined, content.len() as u64);
}

#[test]
fn test_second_run_finds_nothing() {
    let dir = tempdir().unwrap();
    let root = canonical_root(&dir);
    fs::write(root.join("a.txt"), "again").unwrap();
    fs::write(root.join("b.txt"), "again").unwrap();
    fs::write(root.join("c.txt"), "again").unwrap();

    let first = run(&root);
    assert_eq!(first.summary.duplicate_pairs, 2);

    let second = run(&root);
    assert_eq!(second.summary.duplicate_pairs, 0);
    assert_eq!(second.summary.files_scanned, 1);
    assert_eq!(quarantined_names(&root).len(), 2);
}

#[test]
fn test_empty_files_pair_like_any_other_size() {
    let dir = tempdir().unwrap();
    let root = canonical_root(&dir);
    fs::write(root.join("a.txt"), "").unwrap();
    fs::write(root.join("b.txt"), "").unwrap();

    let report = run(&root);
    assert_eq!(report.summary.files_scanned, 2);
    assert_eq!(report.summary.duplicate_pairs, 1);
    assert!(root.join("a.txt").exists());
    assert_eq!(quarantined_names(&root), vec!["b.txt"]);
}

#[test]
fn test_skip_empty_leaves_zero_byte_files() {
    let dir = tempdir().unwrap();
    let root = canonical_root(&dir);
    fs::write(root.join("empty1"), "").unwrap();
    fs::write(root.join("empty2"), "").unwrap();

    let report = run_scan(
        &root,
        &RunOptions::default().with_skip_empty(true),
        Arc::new(AtomicBool::new(false)),
        None,
    );
    assert_eq!(report.summary.files_scanned, 0);
    assert_eq!(report.summary.duplicate_pairs, 0);
    assert!(!root.join(QUARANTINE_DIR_NAME).exists());
}

#[test]
fn test_dry_run_reports_without_moving() {
    let dir = tempdir().unwrap();
    let root = canonical_root(&dir);
    fs::write(root.join("a.txt"), "same").unwrap();
    fs::write(root.join("b.txt"), "same").unwrap();

    let report = run_scan(
        &root,
        &RunOptions::default().with_dry_run(true),
        Arc::new(AtomicBool::new(false)),
        None,
    );

    assert!(report.dry_run);
    assert_eq!(report.summary.moves_succeeded, 1);
    assert!(report.moves[0].destination.ends_with("b.txt"));
    assert!(root.join("b.txt").exists());
    assert!(!root.join(QUARANTINE_DIR_NAME).exists());
}

#[test]
fn test_single_thread_matches_parallel() {
    let dir = tempdir().unwrap();
    let root = canonical_root(&dir);
    for i in 0..12 {
        fs::write(root.join(format!("f{i:02}.txt")), format!("group {}", i % 3)).unwrap();
    }

    let parallel = run_scan(
        &root,
        &RunOptions::default().with_dry_run(true).with_io_threads(8),
        Arc::new(AtomicBool::new(false)),
        None,
    );
    let single = run_scan(
        &root,
        &RunOptions::default().with_dry_run(true).with_io_threads(1),
        Arc::new(AtomicBool::new(false)),
        None,
    );

    assert_eq!(parallel.summary.duplicate_pairs, 9);
    assert_eq!(parallel.moves, single.moves);
}
