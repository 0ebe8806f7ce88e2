use dupecleaner::duplicates::{DuplicateEntry, DuplicateSet, EntryId, SelectionError, SelectionObserver};
use dupecleaner::scanner::{FileRef, Fingerprint};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One group per entry of `groups`, each file named after its directory.
fn build(groups: &[&[&str]]) -> DuplicateSet {
    let buckets: Vec<_> = groups
        .iter()
        .enumerate()
        .map(|(i, dirs)| {
            let files: Vec<FileRef> = dirs
                .iter()
                .map(|dir| FileRef::new(*dir, format!("file{i}"), 100 + i as u64))
                .collect();
            (Fingerprint::from_bytes(&[i as u8; 16]), files)
        })
        .collect();
    DuplicateSet::from_buckets(None, buckets)
}

fn id_of(set: &DuplicateSet, group: usize, dir: &str) -> EntryId {
    set.group(group)
        .unwrap()
        .entries()
        .iter()
        .find(|e| e.file().directory == Path::new(dir))
        .map(|e| e.id())
        .unwrap()
}

fn flags(set: &DuplicateSet, group: usize) -> Vec<(bool, bool)> {
    set.group(group)
        .unwrap()
        .entries()
        .iter()
        .map(|e| (e.is_checked(), e.is_kept()))
        .collect()
}

#[test]
fn test_new_set_has_nothing_selected() {
    let set = build(&[&["/a", "/b"], &["/c", "/d", "/e"]]);
    assert_eq!(set.group_count(), 2);
    assert_eq!(set.entry_count(), 5);
    assert!(set.checked_entries().is_empty());
    assert_eq!(set.kept_count(), 0);
}

#[test]
fn test_last_unchecked_copy_cannot_be_checked() {
    let set = build(&[&["/a", "/b", "/c"]]);
    let a = id_of(&set, 1, "/a");
    let b = id_of(&set, 1, "/b");
    let c = id_of(&set, 1, "/c");

    set.toggle_checked(a).unwrap();
    set.toggle_checked(b).unwrap();
    let err = set.toggle_checked(c).unwrap_err();

    assert!(matches!(err, SelectionError::InvariantViolation { group: 1 }));
    assert_eq!(flags(&set, 1), vec![(true, false), (true, false), (false, false)]);

    // Unchecking frees another copy to be checked
    set.toggle_checked(a).unwrap();
    set.toggle_checked(c).unwrap();
    assert_eq!(flags(&set, 1), vec![(false, false), (true, false), (true, false)]);
}

#[test]
fn test_keep_checks_the_rest_and_promotion_demotes() {
    let set = build(&[&["/a", "/b", "/c"]]);
    let a = id_of(&set, 1, "/a");
    let c = id_of(&set, 1, "/c");

    set.toggle_kept(a).unwrap();
    assert_eq!(flags(&set, 1), vec![(false, true), (true, false), (true, false)]);

    set.toggle_kept(c).unwrap();
    assert_eq!(flags(&set, 1), vec![(true, false), (true, false), (false, true)]);
    assert_eq!(set.kept_count(), 1);
    assert_eq!(set.group(1).unwrap().kept_entry().unwrap().id(), c);
}

#[test]
fn test_kept_entry_ignores_check_toggle() {
    let set = build(&[&["/a", "/b"]]);
    let a = id_of(&set, 1, "/a");

    set.toggle_kept(a).unwrap();
    set.toggle_checked(a).unwrap();
    assert_eq!(flags(&set, 1), vec![(false, true), (true, false)]);
}

#[test]
fn test_unkeep_leaves_one_copy_unchecked() {
    let set = build(&[&["/a", "/b", "/c"]]);
    let b = id_of(&set, 1, "/b");

    set.toggle_kept(b).unwrap();
    set.toggle_kept(b).unwrap();

    assert_eq!(flags(&set, 1), vec![(true, false), (false, false), (true, false)]);
    assert!(matches!(
        set.toggle_checked(b),
        Err(SelectionError::InvariantViolation { .. })
    ));
}

#[test]
fn test_keep_directory_spans_groups() {
    let set = build(&[
        &["/originals", "/copies"],
        &["/originals", "/backup", "/copies"],
        &["/backup", "/copies"],
    ]);

    let touched = set.keep_directory(Path::new("/originals"));
    assert_eq!(touched, 2);
    assert_eq!(set.kept_count(), 2);

    let checked: Vec<_> = set
        .checked_entries()
        .iter()
        .map(|e| e.file().directory.clone())
        .collect();
    assert_eq!(checked.len(), 3);
    assert!(checked.iter().all(|d| d != Path::new("/originals")));
    // Group 3 has no copy in /originals and is untouched
    assert_eq!(flags(&set, 3), vec![(false, false), (false, false)]);
}

#[test]
fn test_keep_directory_twice_releases() {
    let set = build(&[&["/a", "/b"]]);

    set.keep_directory(Path::new("/a"));
    set.keep_directory(Path::new("/a"));
    assert_eq!(set.kept_count(), 0);
    assert_eq!(flags(&set, 1), vec![(false, false), (true, false)]);
}

#[test]
fn test_check_directory_respects_last_copy() {
    let set = build(&[&["/x", "/y"], &["/x", "/x2"]]);
    set.toggle_checked(id_of(&set, 1, "/y")).unwrap();

    let (checked, rejected) = set.check_directory(Path::new("/x"));
    assert_eq!((checked, rejected), (1, 1));
    assert_eq!(flags(&set, 1), vec![(false, false), (true, false)]);
    assert_eq!(flags(&set, 2), vec![(true, false), (false, false)]);
}

#[test]
fn test_unknown_entry_is_reported() {
    let set = build(&[&["/a", "/b"]]);
    let other = build(&[&["/c", "/d"], &["/e", "/f"]]);
    let foreign = other.group(2).unwrap().entries()[1].id();

    assert!(matches!(
        set.toggle_checked(foreign),
        Err(SelectionError::UnknownEntry(_))
    ));
    assert!(matches!(
        set.toggle_kept(foreign),
        Err(SelectionError::UnknownEntry(_))
    ));
}

#[derive(Default)]
struct Recorder {
    entries: AtomicUsize,
}

impl SelectionObserver for Recorder {
    fn on_entry_changed(&self, _entry: &DuplicateEntry) {
        self.entries.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_observer_sees_selection_changes() {
    let mut set = build(&[&["/a", "/b", "/c"]]);
    let recorder = Arc::new(Recorder::default());
    set.set_observer(recorder.clone());

    set.toggle_checked(id_of(&set, 1, "/a")).unwrap();
    assert_eq!(recorder.entries.load(Ordering::SeqCst), 1);

    set.toggle_kept(id_of(&set, 1, "/b")).unwrap();
    assert_eq!(recorder.entries.load(Ordering::SeqCst), 4);

    // Rejected and no-op toggles are silent
    let before = recorder.entries.load(Ordering::SeqCst);
    let _ = set.toggle_checked(id_of(&set, 1, "/b"));
    assert_eq!(recorder.entries.load(Ordering::SeqCst), before);
}

#[test]
fn test_concurrent_toggles_keep_model_consistent() {
    let dirs: Vec<String> = (0..6).map(|i| format!("/d{i}")).collect();
    let dir_refs: Vec<&str> = dirs.iter().map(String::as_str).collect();
    let groups: Vec<&[&str]> = (0..20).map(|_| &dir_refs[..]).collect();
    let set = Arc::new(build(&groups));
    let ids: Vec<EntryId> = set.entries().iter().map(DuplicateEntry::id).collect();

    std::thread::scope(|s| {
        for t in 0..4 {
            let set = Arc::clone(&set);
            let ids = &ids;
            s.spawn(move || {
                for (i, id) in ids.iter().enumerate() {
                    if (i + t) % 5 == 0 {
                        let _ = set.toggle_kept(*id);
                    } else {
                        let _ = set.toggle_checked(*id);
                    }
                }
            });
        }
    });

    for group in set.groups() {
        let kept = group.entries().iter().filter(|e| e.is_kept()).count();
        assert!(kept <= 1);
        if kept == 0 {
            assert!(group.checked_count() < group.len());
        }
        assert!(group.entries().iter().all(|e| !(e.is_checked() && e.is_kept())));
    }
}
