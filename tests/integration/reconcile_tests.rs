use dupecleaner::actions::{delete_checked, remove_empty_dirs, DeleteOptions};
use dupecleaner::duplicates::{scan, DuplicateSet, ScanConfig, ScanOutcome};
use dupecleaner::progress::SilentProgress;
use dupecleaner::signal::CancellationToken;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn scan_set(root: &Path) -> DuplicateSet {
    match scan(
        root,
        ScanConfig::default(),
        CancellationToken::new(),
        Arc::new(SilentProgress),
    )
    .unwrap()
    {
        ScanOutcome::Completed(set, _) => set,
        ScanOutcome::Cancelled => panic!("scan was cancelled"),
    }
}

#[test]
fn test_delete_copy_and_tidy_empty_directory() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/f1", b"identical bytes");
    write(dir.path(), "b/f1", b"identical bytes");
    write(dir.path(), "c/f2", b"something else");

    let mut set = scan_set(dir.path());
    set.keep_directory(&dir.path().join("a"));

    let options = DeleteOptions::default()
        .with_delete_empty_dirs(true)
        .with_boundary(dir.path());
    let summary = delete_checked(&mut set, &options);

    assert!(summary.all_succeeded());
    assert_eq!(summary.deleted_count, 1);
    assert_eq!(summary.bytes_freed, 15);
    assert_eq!(summary.removed_dirs, vec![dir.path().join("b")]);
    assert_eq!(summary.groups_remaining, 0);

    assert!(dir.path().join("a/f1").exists());
    assert!(!dir.path().join("b").exists());
    assert!(dir.path().join("c/f2").exists());
    assert!(dir.path().exists());
    assert!(set.is_empty());
}

#[test]
fn test_survivors_keep_their_group_and_are_renumbered() {
    let dir = tempdir().unwrap();
    write(dir.path(), "one/x", b"first content");
    write(dir.path(), "two/x", b"first content");
    write(dir.path(), "one/y", b"second content!");
    write(dir.path(), "two/y", b"second content!");
    write(dir.path(), "three/y", b"second content!");

    let mut set = scan_set(dir.path());
    assert_eq!(set.group_count(), 2);

    // Resolve only the pair; the triple loses one copy and stays a group
    let x_two = set.find_entry(&dir.path().join("two/x")).unwrap();
    set.toggle_checked(x_two).unwrap();
    let y_three = set.find_entry(&dir.path().join("three/y")).unwrap();
    set.toggle_checked(y_three).unwrap();

    let summary = delete_checked(&mut set, &DeleteOptions::default());
    assert_eq!(summary.deleted_count, 2);
    assert_eq!(summary.groups_remaining, 1);

    let groups = set.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].number(), 1);
    assert!(!groups[0].is_alternate());
    assert_eq!(groups[0].len(), 2);
    assert!(set.find_entry(&dir.path().join("one/x")).is_none());
    let orders: Vec<_> = groups[0].entries().iter().map(|e| e.display_order()).collect();
    assert_eq!(orders, vec![0, 1]);
}

#[test]
fn test_failed_deletion_stays_in_model() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/f", b"same same");
    write(dir.path(), "b/f", b"same same");
    write(dir.path(), "c/f", b"same same");

    let mut set = scan_set(dir.path());
    let b = set.find_entry(&dir.path().join("b/f")).unwrap();
    let c = set.find_entry(&dir.path().join("c/f")).unwrap();
    set.toggle_checked(b).unwrap();
    set.toggle_checked(c).unwrap();

    // Vanishes behind the model's back
    fs::remove_file(dir.path().join("c/f")).unwrap();

    let summary = delete_checked(&mut set, &DeleteOptions::default());
    assert_eq!(summary.deleted_count, 1);
    assert_eq!(summary.failed_count, 1);
    assert!(!summary.all_succeeded());
    assert_eq!(summary.failures[0].entry, c);
    assert_eq!(summary.failures[0].path, dir.path().join("c/f"));

    let entry = set.entry(c).unwrap();
    assert!(entry.is_checked());
    assert_eq!(set.group_count(), 1);
    assert_eq!(set.entry_count(), 2);
    assert!(set.entry(b).is_none());
}

#[test]
fn test_size_change_blocks_deletion() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/f", b"original");
    write(dir.path(), "b/f", b"original");

    let mut set = scan_set(dir.path());
    let b = set.find_entry(&dir.path().join("b/f")).unwrap();
    set.toggle_checked(b).unwrap();
    fs::write(dir.path().join("b/f"), b"rewritten since the scan").unwrap();

    let summary = delete_checked(&mut set, &DeleteOptions::default());
    assert_eq!(summary.failed_count, 1);
    assert!(dir.path().join("b/f").exists());

    let summary = delete_checked(&mut set, &DeleteOptions::default().with_verify_size(false));
    assert_eq!(summary.deleted_count, 1);
    assert!(!dir.path().join("b/f").exists());
}

#[test]
fn test_nothing_checked_is_a_no_op() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/f", b"dup");
    write(dir.path(), "b/f", b"dup");

    let mut set = scan_set(dir.path());
    let summary = delete_checked(&mut set, &DeleteOptions::default().with_delete_empty_dirs(true));

    assert_eq!(summary.deleted_count, 0);
    assert!(summary.removed_dirs.is_empty());
    assert_eq!(set.group_count(), 1);
    assert!(dir.path().join("a/f").exists() && dir.path().join("b/f").exists());
}

#[test]
fn test_empty_dir_cleanup_disabled_by_default() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/f", b"dup");
    write(dir.path(), "b/f", b"dup");

    let mut set = scan_set(dir.path());
    set.keep_directory(&dir.path().join("a"));
    let summary = delete_checked(&mut set, &DeleteOptions::default());

    assert_eq!(summary.deleted_count, 1);
    assert!(dir.path().join("b").is_dir());
}

#[test]
fn test_remove_empty_dirs_climbs_to_boundary() {
    let dir = tempdir().unwrap();
    let deep = dir.path().join("x/y/z");
    fs::create_dir_all(&deep).unwrap();
    write(dir.path(), "x/keep.txt", b"stay");

    let removed = remove_empty_dirs(&deep, Some(dir.path()));
    assert_eq!(removed, vec![deep.clone(), dir.path().join("x/y")]);
    assert!(dir.path().join("x").is_dir());

    let lone = dir.path().join("lone/inner");
    fs::create_dir_all(&lone).unwrap();
    let removed = remove_empty_dirs(&lone, Some(dir.path()));
    assert_eq!(removed.len(), 2);
    assert!(dir.path().is_dir());
}

#[test]
fn test_remove_empty_dirs_ignores_missing_start() {
    let dir = tempdir().unwrap();
    let removed = remove_empty_dirs(&dir.path().join("never"), Some(dir.path()));
    assert!(removed.is_empty());
}

#[cfg(unix)]
#[test]
fn test_followed_symlink_never_exposes_the_only_copy() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/only_copy", b"irreplaceable");
    std::os::unix::fs::symlink(dir.path().join("a"), dir.path().join("link")).unwrap();

    let outcome = scan(
        dir.path(),
        ScanConfig::default().with_follow_symlinks(true),
        CancellationToken::new(),
        Arc::new(SilentProgress),
    )
    .unwrap();
    let ScanOutcome::Completed(mut set, _) = outcome else {
        panic!("scan was cancelled");
    };
    assert!(set.is_empty());

    let summary = delete_checked(&mut set, &DeleteOptions::default());
    assert_eq!(summary.deleted_count, 0);
    assert!(dir.path().join("a/only_copy").exists());
}

#[cfg(unix)]
#[test]
fn test_followed_symlink_with_real_copy_keeps_one() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/f", b"twice on disk");
    write(dir.path(), "b/f", b"twice on disk");
    std::os::unix::fs::symlink(dir.path().join("a"), dir.path().join("link")).unwrap();

    let outcome = scan(
        dir.path(),
        ScanConfig::default().with_follow_symlinks(true),
        CancellationToken::new(),
        Arc::new(SilentProgress),
    )
    .unwrap();
    let ScanOutcome::Completed(mut set, _) = outcome else {
        panic!("scan was cancelled");
    };
    assert_eq!(set.entry_count(), 2);
    assert!(set.find_entry(&dir.path().join("link/f")).is_none());

    let a = set.find_entry(&dir.path().join("a/f")).unwrap();
    set.toggle_checked(a).unwrap();
    let summary = delete_checked(&mut set, &DeleteOptions::default());

    assert_eq!(summary.deleted_count, 1);
    assert_eq!(fs::read(dir.path().join("b/f")).unwrap(), b"twice on disk");
}
