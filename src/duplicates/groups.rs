//! Confirmed duplicate groups and their selection state.
//!
//! # Overview
//!
//! A [`DuplicateSet`] holds the groups confirmed by a scan. Every
//! [`DuplicateEntry`] carries two flags:
//!
//! - `checked`: marked for deletion by the next reconciliation pass
//! - `kept`: explicitly protected; a kept entry never reads as checked
//!
//! The model enforces two rules:
//!
//! 1. In a group without a kept entry, the checked entries never cover every
//!    member. [`DuplicateSet::toggle_checked`] rejects the mutation that
//!    would do so with [`SelectionError::InvariantViolation`].
//! 2. A group holds at most one kept entry. Promoting a new keeper with
//!    [`DuplicateSet::toggle_kept`] demotes the previous one.
//!
//! Each group sits behind its own mutex, so selection operations on distinct
//! groups may run in parallel ([`DuplicateSet::keep_directory`] does).
//!
//! # Example
//!
//! ```
//! use dupecleaner::duplicates::{DuplicateSet, SelectionError};
//! use dupecleaner::scanner::{FileRef, Fingerprint};
//!
//! let files = vec![
//!     FileRef::new("/a", "f1", 10),
//!     FileRef::new("/b", "f1", 10),
//!     FileRef::new("/c", "f1", 10),
//! ];
//! let set = DuplicateSet::from_buckets(None, vec![(Fingerprint::from_bytes(&[1]), files)]);
//! let ids: Vec<_> = set.entries().iter().map(|e| e.id()).collect();
//!
//! set.toggle_checked(ids[0]).unwrap();
//! set.toggle_checked(ids[1]).unwrap();
//! // The last unchecked copy cannot be marked too
//! assert!(matches!(
//!     set.toggle_checked(ids[2]),
//!     Err(SelectionError::InvariantViolation { .. })
//! ));
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rayon::prelude::*;
use serde::Serialize;

use crate::scanner::{FileRef, Fingerprint};

/// Stable identifier of an entry within one [`DuplicateSet`].
///
/// Identifiers survive renumbering and are never reused within a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    /// Raw numeric value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors returned by selection operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// The entry does not belong to this set (deleted or from another scan).
    #[error("unknown duplicate entry {0}")]
    UnknownEntry(EntryId),

    /// Checking the entry would mark every copy in the group for deletion.
    #[error("cannot mark every copy for deletion (group {group})")]
    InvariantViolation {
        /// Number of the group that rejected the mutation
        group: usize,
    },
}

/// One file within a confirmed duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateEntry {
    id: EntryId,
    file: FileRef,
    group_number: usize,
    display_order: usize,
    alternate: bool,
    checked: bool,
    kept: bool,
}

impl DuplicateEntry {
    /// Entry identifier.
    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// The underlying file.
    #[must_use]
    pub fn file(&self) -> &FileRef {
        &self.file
    }

    /// Full path of the underlying file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.file.path()
    }

    /// Number of the group this entry belongs to (1-based, contiguous).
    #[must_use]
    pub fn group_number(&self) -> usize {
        self.group_number
    }

    /// Row index in the flattened presentation order.
    #[must_use]
    pub fn display_order(&self) -> usize {
        self.display_order
    }

    /// Alternating band flag, shared by every entry of a group.
    #[must_use]
    pub fn is_alternate(&self) -> bool {
        self.alternate
    }

    /// Whether the entry is marked for deletion.
    ///
    /// Always `false` for a kept entry, whatever the stored bit says.
    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.checked && !self.kept
    }

    /// Whether the entry is explicitly protected from deletion.
    #[must_use]
    pub fn is_kept(&self) -> bool {
        self.kept
    }
}

/// A set of files sharing a confirmation fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    number: usize,
    fingerprint: Fingerprint,
    alternate: bool,
    entries: Vec<DuplicateEntry>,
}

impl DuplicateGroup {
    /// Group number (1-based, contiguous across the set).
    #[must_use]
    pub fn number(&self) -> usize {
        self.number
    }

    /// Confirmation fingerprint shared by every member.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Alternating band flag for visual grouping.
    #[must_use]
    pub fn is_alternate(&self) -> bool {
        self.alternate
    }

    /// Members sorted by directory, then name.
    #[must_use]
    pub fn entries(&self) -> &[DuplicateEntry] {
        &self.entries
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of one copy in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.entries.first().map_or(0, |e| e.file.size)
    }

    /// Space held by the extra copies (all copies minus one).
    #[must_use]
    pub fn wasted_bytes(&self) -> u64 {
        self.size() * self.entries.len().saturating_sub(1) as u64
    }

    /// The kept entry, if any.
    #[must_use]
    pub fn kept_entry(&self) -> Option<&DuplicateEntry> {
        self.entries.iter().find(|e| e.kept)
    }

    /// Number of members currently reading as checked.
    #[must_use]
    pub fn checked_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_checked()).count()
    }

    fn position(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    fn toggle_checked(&mut self, id: EntryId) -> Result<bool, SelectionError> {
        let idx = self.position(id).ok_or(SelectionError::UnknownEntry(id))?;
        if self.entries[idx].kept {
            return Ok(false);
        }

        if !self.entries[idx].checked {
            let has_keeper = self.entries.iter().any(|e| e.kept);
            let others_all_checked = self
                .entries
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != idx)
                .all(|(_, e)| e.is_checked());
            if !has_keeper && others_all_checked {
                log::debug!(
                    "Rejected checking {}: every other copy in group {} is checked",
                    self.entries[idx].path().display(),
                    self.number
                );
                return Err(SelectionError::InvariantViolation {
                    group: self.number,
                });
            }
        }

        let entry = &mut self.entries[idx];
        entry.checked = !entry.checked;
        log::debug!(
            "{} {}",
            if entry.checked { "Checked" } else { "Unchecked" },
            entry.path().display()
        );
        Ok(true)
    }

    fn toggle_kept(&mut self, id: EntryId) -> Result<(), SelectionError> {
        let idx = self.position(id).ok_or(SelectionError::UnknownEntry(id))?;
        let other_keeper = self
            .entries
            .iter()
            .enumerate()
            .any(|(i, e)| i != idx && e.kept);

        if self.entries[idx].kept {
            // Un-keep. Without another keeper the rest of the group defaults
            // back to checked; toggle_checked guards the last copy later.
            if !other_keeper {
                for (_, entry) in self.entries.iter_mut().enumerate().filter(|(i, _)| *i != idx) {
                    entry.checked = true;
                }
            }
            let entry = &mut self.entries[idx];
            entry.kept = false;
            entry.checked = false;
            log::debug!("No longer keeping {}", entry.path().display());
        } else {
            for (_, entry) in self.entries.iter_mut().enumerate().filter(|(i, _)| *i != idx) {
                if entry.kept {
                    entry.kept = false;
                    log::debug!("Demoted previous keeper {}", entry.path().display());
                }
                entry.checked = true;
            }
            let entry = &mut self.entries[idx];
            entry.kept = true;
            entry.checked = false;
            log::debug!("Keeping {}", entry.path().display());
        }
        Ok(())
    }
}

/// Receives change notifications from a [`DuplicateSet`].
///
/// Presentation layers implement this to refresh rows after a mutation.
/// Callbacks run on the thread performing the mutation, after the group
/// lock has been released.
pub trait SelectionObserver: Send + Sync {
    /// Called for every entry whose flags may have changed.
    fn on_entry_changed(&self, _entry: &DuplicateEntry) {}

    /// Called after entries or groups were removed and renumbered.
    fn on_set_changed(&self, _groups: usize, _entries: usize) {}
}

/// All confirmed duplicate groups of one scan.
#[derive(Default)]
pub struct DuplicateSet {
    root: Option<PathBuf>,
    groups: Vec<Mutex<DuplicateGroup>>,
    locator: HashMap<EntryId, usize>,
    observer: Option<Arc<dyn SelectionObserver>>,
}

impl fmt::Debug for DuplicateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuplicateSet")
            .field("root", &self.root)
            .field("groups", &self.groups())
            .field("observer", &self.observer.as_ref().map(|_| "<observer>"))
            .finish()
    }
}

fn lock(slot: &Mutex<DuplicateGroup>) -> MutexGuard<'_, DuplicateGroup> {
    // Mutations never leave a group half-updated, so a poisoned lock still
    // guards consistent state.
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DuplicateSet {
    /// Build a set from confirmed fingerprint buckets.
    ///
    /// Groups are numbered from 1 in bucket order, members are sorted by
    /// (directory, name), and the band flag alternates per group. Buckets
    /// with fewer than two files are ignored.
    ///
    /// # Arguments
    ///
    /// * `root` - Directory the scan started from, if known
    /// * `buckets` - Confirmation fingerprint buckets
    #[must_use]
    pub fn from_buckets(
        root: Option<PathBuf>,
        buckets: impl IntoIterator<Item = (Fingerprint, Vec<FileRef>)>,
    ) -> Self {
        let mut next_id = 0u64;
        let groups = buckets
            .into_iter()
            .filter(|(_, files)| files.len() >= 2)
            .map(|(fingerprint, mut files)| {
                files.sort_by(|a, b| {
                    a.directory
                        .cmp(&b.directory)
                        .then_with(|| a.name.cmp(&b.name))
                });
                let entries = files
                    .into_iter()
                    .map(|file| {
                        next_id += 1;
                        DuplicateEntry {
                            id: EntryId(next_id),
                            file,
                            group_number: 0,
                            display_order: 0,
                            alternate: false,
                            checked: false,
                            kept: false,
                        }
                    })
                    .collect();
                Mutex::new(DuplicateGroup {
                    number: 0,
                    fingerprint,
                    alternate: false,
                    entries,
                })
            })
            .collect();

        let mut set = Self {
            root,
            groups,
            locator: HashMap::new(),
            observer: None,
        };
        set.renumber();
        set
    }

    /// Attach an observer that is notified after every mutation.
    pub fn set_observer(&mut self, observer: Arc<dyn SelectionObserver>) {
        self.observer = Some(observer);
    }

    /// Directory the scan started from.
    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Number of groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of entries across all groups (the "N duplicates" count).
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.locator.len()
    }

    /// Check if the set holds no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Snapshot of every group in display order.
    #[must_use]
    pub fn groups(&self) -> Vec<DuplicateGroup> {
        self.groups.iter().map(|slot| lock(slot).clone()).collect()
    }

    /// Snapshot of the group with the given number.
    #[must_use]
    pub fn group(&self, number: usize) -> Option<DuplicateGroup> {
        let slot = self.groups.get(number.checked_sub(1)?)?;
        Some(lock(slot).clone())
    }

    /// Snapshot of every entry in display order.
    #[must_use]
    pub fn entries(&self) -> Vec<DuplicateEntry> {
        self.groups
            .iter()
            .flat_map(|slot| lock(slot).entries.clone())
            .collect()
    }

    /// Snapshot of one entry.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> Option<DuplicateEntry> {
        let group = lock(&self.groups[*self.locator.get(&id)?]);
        group.entries.iter().find(|e| e.id == id).cloned()
    }

    /// Find the entry for a file path.
    #[must_use]
    pub fn find_entry(&self, path: &Path) -> Option<EntryId> {
        self.groups.iter().find_map(|slot| {
            lock(slot)
                .entries
                .iter()
                .find(|e| e.path() == path)
                .map(|e| e.id)
        })
    }

    /// Every entry currently reading as checked, in display order.
    #[must_use]
    pub fn checked_entries(&self) -> Vec<DuplicateEntry> {
        self.entries()
            .into_iter()
            .filter(DuplicateEntry::is_checked)
            .collect()
    }

    /// Number of kept entries across all groups.
    #[must_use]
    pub fn kept_count(&self) -> usize {
        self.groups
            .iter()
            .map(|slot| lock(slot).entries.iter().filter(|e| e.kept).count())
            .sum()
    }

    /// Space held by extra copies across all groups.
    #[must_use]
    pub fn wasted_bytes(&self) -> u64 {
        self.groups.iter().map(|slot| lock(slot).wasted_bytes()).sum()
    }

    /// Flip the checked flag of an entry.
    ///
    /// A kept entry is left untouched.
    ///
    /// # Errors
    ///
    /// - `InvariantViolation` if checking the entry would mark every copy of
    ///   a group without a keeper; the model is unchanged
    /// - `UnknownEntry` if the entry is not in this set
    pub fn toggle_checked(&self, id: EntryId) -> Result<(), SelectionError> {
        let slot = self.slot(id)?;
        let changed = {
            let mut group = lock(slot);
            group
                .toggle_checked(id)?
                .then(|| group.entries.iter().find(|e| e.id == id).cloned())
                .flatten()
        };
        if let (Some(observer), Some(entry)) = (&self.observer, changed) {
            observer.on_entry_changed(&entry);
        }
        Ok(())
    }

    /// Keep an entry, or stop keeping it.
    ///
    /// - Keeping demotes any previous keeper of the group and checks every
    ///   other member.
    /// - Un-keeping clears the entry's checked flag and, when no other keeper
    ///   remains, checks every other member. The result may be one step from
    ///   the all-checked state; [`toggle_checked`](Self::toggle_checked)
    ///   enforces the rule on the next mutation.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntry` if the entry is not in this set.
    pub fn toggle_kept(&self, id: EntryId) -> Result<(), SelectionError> {
        let slot = self.slot(id)?;
        let changed = {
            let mut group = lock(slot);
            group.toggle_kept(id)?;
            group.entries.clone()
        };
        self.notify_entries(&changed);
        Ok(())
    }

    /// Keep the copy stored in `directory` in every group that has one.
    ///
    /// For each group, the first member whose directory equals `directory`
    /// is passed to [`toggle_kept`](Self::toggle_kept), so calling this on
    /// a directory that is already kept releases it again. Groups are
    /// processed in parallel.
    ///
    /// # Returns
    ///
    /// The number of groups that had a member in `directory`.
    pub fn keep_directory(&self, directory: &Path) -> usize {
        let touched: Vec<Vec<DuplicateEntry>> = self
            .groups
            .par_iter()
            .filter_map(|slot| {
                let mut group = lock(slot);
                let id = group
                    .entries
                    .iter()
                    .find(|e| e.file.directory == directory)
                    .map(|e| e.id)?;
                group.toggle_kept(id).ok()?;
                Some(group.entries.clone())
            })
            .collect();

        for entries in &touched {
            self.notify_entries(entries);
        }
        log::info!(
            "Toggled keep for {} in {} group(s)",
            directory.display(),
            touched.len()
        );
        touched.len()
    }

    /// Check every unchecked, unkept copy stored in `directory`.
    ///
    /// Copies whose check would violate the last-copy rule are skipped.
    ///
    /// # Returns
    ///
    /// `(checked, rejected)` counts.
    pub fn check_directory(&self, directory: &Path) -> (usize, usize) {
        let candidates: Vec<EntryId> = self
            .entries()
            .into_iter()
            .filter(|e| e.file.directory == directory && !e.is_checked() && !e.kept)
            .map(|e| e.id)
            .collect();

        let mut checked = 0;
        let mut rejected = 0;
        for id in candidates {
            match self.toggle_checked(id) {
                Ok(()) => checked += 1,
                Err(e) => {
                    log::warn!("{}", e);
                    rejected += 1;
                }
            }
        }
        (checked, rejected)
    }

    fn slot(&self, id: EntryId) -> Result<&Mutex<DuplicateGroup>, SelectionError> {
        self.locator
            .get(&id)
            .and_then(|&idx| self.groups.get(idx))
            .ok_or(SelectionError::UnknownEntry(id))
    }

    fn notify_entries(&self, entries: &[DuplicateEntry]) {
        if let Some(ref observer) = self.observer {
            for entry in entries {
                observer.on_entry_changed(entry);
            }
        }
    }

    pub(crate) fn notify_set_changed(&self) {
        if let Some(ref observer) = self.observer {
            observer.on_set_changed(self.group_count(), self.entry_count());
        }
    }

    /// Remove the given entries from their groups.
    ///
    /// Groups are not pruned or renumbered here.
    pub(crate) fn remove_entries(&mut self, ids: &HashSet<EntryId>) -> Vec<DuplicateEntry> {
        let mut removed = Vec::new();
        for slot in &mut self.groups {
            let group = slot.get_mut().unwrap_or_else(PoisonError::into_inner);
            let (gone, remaining): (Vec<_>, Vec<_>) = std::mem::take(&mut group.entries)
                .into_iter()
                .partition(|e| ids.contains(&e.id));
            group.entries = remaining;
            removed.extend(gone);
        }
        for entry in &removed {
            self.locator.remove(&entry.id);
        }
        removed
    }

    /// Drop every group with fewer than two members.
    ///
    /// # Returns
    ///
    /// The survivors of dropped groups, which are no longer duplicates.
    pub(crate) fn prune_singletons(&mut self) -> Vec<DuplicateEntry> {
        let mut evicted = Vec::new();
        for slot in std::mem::take(&mut self.groups) {
            let group = slot.into_inner().unwrap_or_else(PoisonError::into_inner);
            if group.entries.len() >= 2 {
                self.groups.push(Mutex::new(group));
            } else {
                log::debug!(
                    "Group {} no longer has duplicates, removing it",
                    group.number
                );
                for entry in &group.entries {
                    self.locator.remove(&entry.id);
                }
                evicted.extend(group.entries);
            }
        }
        evicted
    }

    /// Renumber groups from 1, recompute band flags and display order.
    pub(crate) fn renumber(&mut self) {
        let mut order = 0;
        let mut alternate = false;
        self.locator.clear();

        for (idx, slot) in self.groups.iter_mut().enumerate() {
            let group = slot.get_mut().unwrap_or_else(PoisonError::into_inner);
            group.number = idx + 1;
            group.alternate = alternate;
            for entry in &mut group.entries {
                entry.group_number = idx + 1;
                entry.alternate = alternate;
                entry.display_order = order;
                order += 1;
                self.locator.insert(entry.id, idx);
            }
            alternate = !alternate;
        }
    }
}
