use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dupequarantine::duplicates::{group_by_size, Classifier, ClassifierConfig};
use dupequarantine::scanner::{FileRecord, Hasher, Walker, WalkerConfig};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// Helper to create a test directory with a specific structure
fn setup_test_dir(depth: usize, files_per_dir: usize) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    create_dir_recursive(temp_dir.path().to_path_buf(), depth, files_per_dir);
    temp_dir
}

fn create_dir_recursive(path: PathBuf, depth: usize, files_per_dir: usize) {
    if depth == 0 {
        return;
    }

    if !path.exists() {
        fs::create_dir_all(&path).expect("Failed to create dir");
    }

    for i in 0..files_per_dir {
        // Every third file shares content with its neighbours
        let content = format!("payload number {:04}", i / 3);
        fs::write(path.join(format!("file_{i}.txt")), content).expect("Failed to write file");
    }

    if depth > 1 {
        for i in 0..2 {
            create_dir_recursive(path.join(format!("dir_{i}")), depth - 1, files_per_dir);
        }
    }
}

fn collect_records(dir: &TempDir) -> Vec<FileRecord> {
    Walker::new(dir.path(), WalkerConfig::default())
        .walk()
        .filter_map(Result::ok)
        .collect()
}

// 1. Directory Walking Benchmarks
fn bench_walker(c: &mut Criterion) {
    let temp_dir = setup_test_dir(4, 10);
    let config = WalkerConfig::default();

    c.bench_function("walker_150_files", |b| {
        b.iter(|| {
            let walker = Walker::new(temp_dir.path(), config.clone());
            let files: Vec<_> = walker.walk().collect();
            black_box(files);
        })
    });
}

// 2. Hashing Benchmarks
fn bench_hasher(c: &mut Criterion) {
    let mut group = c.benchmark_group("hasher");
    let hasher = Hasher::new();

    for size_kb in [1, 1024, 10240] {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.bin");
        fs::write(&file_path, vec![0u8; size_kb * 1024]).unwrap();

        group.bench_with_input(BenchmarkId::new("prehash", size_kb), &file_path, |b, p| {
            b.iter(|| black_box(hasher.prehash(p).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("full_hash", size_kb), &file_path, |b, p| {
            b.iter(|| black_box(hasher.full_hash(p).unwrap()))
        });
    }
    group.finish();
}

// 3. Size Grouping Benchmarks
fn bench_grouping(c: &mut Criterion) {
    let temp_dir = setup_test_dir(4, 10);
    let records = collect_records(&temp_dir);

    c.bench_function("group_by_size_150_files", |b| {
        b.iter(|| black_box(group_by_size(records.clone())))
    });
}

// 4. Classification Benchmarks
fn bench_classifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("classifier");
    group.sample_size(20);
    let temp_dir = setup_test_dir(4, 10);
    let records = collect_records(&temp_dir);

    for threads in [1, 4] {
        let classifier = Classifier::new(ClassifierConfig::default().with_io_threads(threads));
        group.bench_with_input(BenchmarkId::new("io_threads", threads), &records, |b, r| {
            b.iter(|| black_box(classifier.classify(r.clone())))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_walker,
    bench_hasher,
    bench_grouping,
    bench_classifier
);
criterion_main!(benches);
