use dupecleaner::duplicates::{scan, start_scan, ScanConfig, ScanError, ScanOutcome, ScanState};
use dupecleaner::progress::{ProgressCallback, ScanPhase, SilentProgress};
use dupecleaner::scanner::HashAlgorithm;
use dupecleaner::signal::CancellationToken;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn run(root: &Path, config: ScanConfig) -> ScanOutcome {
    scan(root, config, CancellationToken::new(), Arc::new(SilentProgress)).unwrap()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();

    let ScanOutcome::Completed(set, stats) = run(dir.path(), ScanConfig::default()) else {
        panic!("scan was cancelled");
    };
    assert!(set.is_empty());
    assert_eq!(stats.files_found, 0);
    assert_eq!(stats.duplicate_groups, 0);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"content a");
    write(dir.path(), "b.txt", b"content b");
    write(dir.path(), "c.txt", b"content c");

    let ScanOutcome::Completed(set, stats) = run(dir.path(), ScanConfig::default()) else {
        panic!("scan was cancelled");
    };
    assert!(set.is_empty());
    assert_eq!(stats.files_found, 3);
    assert_eq!(stats.fast_candidates, 0);
}

#[test]
fn test_scan_tree_with_one_duplicate_pair() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/f1", b"identical bytes");
    write(dir.path(), "b/f1", b"identical bytes");
    write(dir.path(), "c/f2", b"something else");

    let ScanOutcome::Completed(set, _) = run(dir.path(), ScanConfig::default()) else {
        panic!("scan was cancelled");
    };

    assert_eq!(set.group_count(), 1);
    let group = set.group(1).unwrap();
    assert_eq!(group.len(), 2);
    let paths: Vec<_> = group.entries().iter().map(|e| e.path()).collect();
    assert_eq!(paths, vec![dir.path().join("a/f1"), dir.path().join("b/f1")]);
    assert!(set.find_entry(&dir.path().join("c/f2")).is_none());
}

#[test]
fn test_same_size_different_content_not_grouped() {
    let dir = tempdir().unwrap();
    write(dir.path(), "x", b"aaaa");
    write(dir.path(), "y", b"bbbb");

    let ScanOutcome::Completed(set, _) = run(dir.path(), ScanConfig::default()) else {
        panic!("scan was cancelled");
    };
    assert!(set.is_empty());
}

#[test]
fn test_every_algorithm_pair_finds_the_same_groups() {
    let dir = tempdir().unwrap();
    for i in 0..9 {
        write(dir.path(), &format!("d{}/f{}", i % 3, i), format!("v{}", i % 3).as_bytes());
    }

    for (fast, confirm) in [
        (HashAlgorithm::Xxh3, HashAlgorithm::Blake3),
        (HashAlgorithm::Md5, HashAlgorithm::Sha1),
        (HashAlgorithm::Blake3, HashAlgorithm::Md5),
    ] {
        let config = ScanConfig::default()
            .with_fast_hash(fast)
            .with_confirm_hash(confirm)
            .with_buffer_size(3);
        let ScanOutcome::Completed(set, _) = run(dir.path(), config) else {
            panic!("scan was cancelled");
        };
        assert_eq!(set.group_count(), 3, "{fast}/{confirm}");
        assert_eq!(set.entry_count(), 9, "{fast}/{confirm}");
        for group in set.groups() {
            assert_eq!(group.fingerprint().as_bytes().len(), confirm.output_len());
        }
    }
}

#[test]
fn test_groups_are_numbered_and_banded() {
    let dir = tempdir().unwrap();
    for i in 0..8 {
        write(dir.path(), &format!("g{}/copy{}", i % 4, i), format!("group {}", i % 4).as_bytes());
    }

    let ScanOutcome::Completed(set, _) = run(dir.path(), ScanConfig::default().with_threads(2))
    else {
        panic!("scan was cancelled");
    };

    let groups = set.groups();
    assert_eq!(groups.len(), 4);
    for (idx, group) in groups.iter().enumerate() {
        assert_eq!(group.number(), idx + 1);
        assert_eq!(group.is_alternate(), idx % 2 == 1);
        let entries = group.entries();
        assert!(entries
            .windows(2)
            .all(|w| (&w[0].file().directory, &w[0].file().name)
                <= (&w[1].file().directory, &w[1].file().name)));
    }
}

#[test]
fn test_invalid_root_is_rejected_synchronously() {
    let dir = tempdir().unwrap();
    write(dir.path(), "file.txt", b"x");

    let err = start_scan(
        &dir.path().join("nope"),
        ScanConfig::default(),
        CancellationToken::new(),
        Arc::new(SilentProgress),
    )
    .unwrap_err();
    assert!(matches!(err, ScanError::PathNotFound(_)));
    assert!(err.to_string().contains("nope"));

    let err = start_scan(
        &dir.path().join("file.txt"),
        ScanConfig::default(),
        CancellationToken::new(),
        Arc::new(SilentProgress),
    )
    .unwrap_err();
    assert!(matches!(err, ScanError::NotADirectory(_)));
}

/// Cancels the scan from inside the first progress event.
struct CancelOnFirstProgress {
    token: CancellationToken,
    events: AtomicUsize,
}

impl ProgressCallback for CancelOnFirstProgress {
    fn on_phase_start(&self, _phase: ScanPhase, _total: usize) {}

    fn on_progress(&self, _phase: ScanPhase, _completed: usize, _total: usize) {
        self.events.fetch_add(1, Ordering::SeqCst);
        self.token.cancel();
    }

    fn on_phase_end(&self, _phase: ScanPhase) {}
}

#[test]
fn test_cancel_during_fast_scan_yields_no_groups() {
    let dir = tempdir().unwrap();
    for i in 0..200 {
        write(dir.path(), &format!("d{}/f{}", i % 10, i), b"all the same");
    }

    let token = CancellationToken::new();
    let sink = Arc::new(CancelOnFirstProgress {
        token: token.clone(),
        events: AtomicUsize::new(0),
    });
    let handle = start_scan(
        dir.path(),
        ScanConfig::default().with_threads(2),
        token,
        sink.clone(),
    )
    .unwrap();
    let outcome = handle.join();

    assert!(outcome.is_cancelled());
    // Only tasks already running when the flag was raised may finish
    assert!(sink.events.load(Ordering::SeqCst) < 200);
}

/// Cancels the scan from inside the first confirmation progress event.
struct CancelOnSlowScan {
    token: CancellationToken,
    fast_events: AtomicUsize,
    slow_started: AtomicUsize,
}

impl ProgressCallback for CancelOnSlowScan {
    fn on_phase_start(&self, phase: ScanPhase, _total: usize) {
        if phase == ScanPhase::SlowScan {
            self.slow_started.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_progress(&self, phase: ScanPhase, _completed: usize, _total: usize) {
        match phase {
            ScanPhase::FastScan => {
                self.fast_events.fetch_add(1, Ordering::SeqCst);
            }
            ScanPhase::SlowScan => self.token.cancel(),
        }
    }

    fn on_phase_end(&self, _phase: ScanPhase) {}
}

#[test]
fn test_cancel_during_slow_scan_yields_no_groups() {
    let dir = tempdir().unwrap();
    for i in 0..100 {
        write(dir.path(), &format!("d{}/f{}", i % 10, i), format!("group {}", i % 5).as_bytes());
    }

    let token = CancellationToken::new();
    let sink = Arc::new(CancelOnSlowScan {
        token: token.clone(),
        fast_events: AtomicUsize::new(0),
        slow_started: AtomicUsize::new(0),
    });
    let handle = start_scan(dir.path(), ScanConfig::default().with_threads(2), token, sink.clone())
        .unwrap();
    let outcome = handle.join();

    assert!(matches!(outcome, ScanOutcome::Cancelled));
    assert_eq!(sink.fast_events.load(Ordering::SeqCst), 100);
    assert_eq!(sink.slow_started.load(Ordering::SeqCst), 1);
}

#[cfg(unix)]
#[test]
fn test_hard_links_are_not_duplicates() {
    let dir = tempdir().unwrap();
    write(dir.path(), "orig", &[7u8; 4096]);
    fs::hard_link(dir.path().join("orig"), dir.path().join("link")).unwrap();

    let ScanOutcome::Completed(set, stats) = run(dir.path(), ScanConfig::default()) else {
        panic!("scan was cancelled");
    };
    assert!(set.is_empty());
    assert_eq!(stats.files_found, 1);
    assert_eq!(stats.wasted_bytes, 0);
}

#[test]
fn test_handle_cancel() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"same");
    write(dir.path(), "b", b"same");

    let token = CancellationToken::new();
    token.cancel();
    let handle = start_scan(dir.path(), ScanConfig::default(), token, Arc::new(SilentProgress))
        .unwrap();
    handle.cancel();

    let outcome = handle.join();
    assert!(matches!(outcome, ScanOutcome::Cancelled));
}

#[test]
fn test_state_is_terminal_after_join() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"same");

    let handle = start_scan(
        dir.path(),
        ScanConfig::default(),
        CancellationToken::new(),
        Arc::new(SilentProgress),
    )
    .unwrap();
    while !handle.is_finished() {
        std::thread::yield_now();
    }
    assert_eq!(handle.state(), ScanState::Completed);
    assert!(!handle.join().is_cancelled());
}

#[test]
fn test_file_removed_between_phases_is_excluded() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/f", b"shared");
    write(dir.path(), "b/f", b"shared");
    write(dir.path(), "c/f", b"shared");

    struct RemoveBeforeSlowScan(std::path::PathBuf);
    impl ProgressCallback for RemoveBeforeSlowScan {
        fn on_phase_start(&self, phase: ScanPhase, _total: usize) {
            if phase == ScanPhase::SlowScan {
                fs::remove_file(&self.0).unwrap();
            }
        }
        fn on_progress(&self, _: ScanPhase, _: usize, _: usize) {}
        fn on_phase_end(&self, _: ScanPhase) {}
    }

    let victim = dir.path().join("c/f");
    let outcome = scan(
        dir.path(),
        ScanConfig::default(),
        CancellationToken::new(),
        Arc::new(RemoveBeforeSlowScan(victim.clone())),
    )
    .unwrap();
    let ScanOutcome::Completed(set, stats) = outcome else {
        panic!("scan was cancelled");
    };

    assert_eq!(stats.failed_files, 1);
    assert_eq!(set.entry_count(), 2);
    assert!(set.find_entry(&victim).is_none());
}
