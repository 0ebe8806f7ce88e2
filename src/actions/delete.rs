//! Reconciliation: delete checked files and tidy the model.
//!
//! # Overview
//!
//! [`delete_checked`] applies the selection held by a
//! [`DuplicateSet`](crate::duplicates::DuplicateSet) to the filesystem:
//!
//! 1. Every entry reading as checked is deleted, one file at a time. Kept
//!    entries never read as checked, so they are never touched.
//! 2. Deleted entries leave their groups. A file that could not be deleted
//!    stays in the model, still checked, so the batch can be retried.
//! 3. Groups left with a single member are dropped.
//! 4. Optionally, directories emptied by the deletions are removed, walking
//!    upward until a non-empty directory is reached.
//! 5. Remaining groups are renumbered from 1.
//!
//! Per-file failures are collected in the [`DeletionSummary`]; the batch
//! never aborts part way.
//!
//! # Example
//!
//! ```no_run
//! use dupecleaner::actions::{delete_checked, DeleteOptions};
//! # fn demo(set: &mut dupecleaner::duplicates::DuplicateSet) {
//! let summary = delete_checked(set, &DeleteOptions::default().with_delete_empty_dirs(true));
//! println!("{}", summary.summary());
//! # }
//! ```

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::{DuplicateSet, EntryId};

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File size changed since the scan.
    #[error("file modified since scan: {path} (expected {expected} bytes, found {actual})")]
    Modified {
        /// Path of the modified file
        path: PathBuf,
        /// Size recorded by the scan
        expected: u64,
        /// Size on disk now
        actual: u64,
    },

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// Path that could not be trashed
        path: PathBuf,
        /// Message from the platform trash
        message: String,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified { path: p, .. }
            | Self::TrashFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }
}

/// How files are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Remove the file permanently
    #[default]
    Permanent,
    /// Move the file to the system trash
    Trash,
}

/// Options for [`delete_checked`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Remove directories left empty by the deletions.
    pub delete_empty_dirs: bool,
    /// Permanent deletion or system trash.
    pub mode: DeleteMode,
    /// Refuse to delete a file whose size changed since the scan.
    pub verify_size: bool,
    /// Directory the empty-directory walk never removes or climbs past.
    pub boundary: Option<PathBuf>,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            delete_empty_dirs: false,
            mode: DeleteMode::Permanent,
            verify_size: true,
            boundary: None,
        }
    }
}

impl DeleteOptions {
    /// Enable/disable empty directory removal.
    #[must_use]
    pub fn with_delete_empty_dirs(mut self, enabled: bool) -> Self {
        self.delete_empty_dirs = enabled;
        self
    }

    /// Set the deletion mode.
    #[must_use]
    pub fn with_mode(mut self, mode: DeleteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable/disable the size check before deletion.
    #[must_use]
    pub fn with_verify_size(mut self, verify: bool) -> Self {
        self.verify_size = verify;
        self
    }

    /// Stop the empty-directory walk at `boundary`.
    #[must_use]
    pub fn with_boundary(mut self, boundary: impl Into<PathBuf>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }
}

/// A file that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    /// Entry left in the model
    pub entry: EntryId,
    /// Path of the file
    pub path: PathBuf,
    /// Error message
    pub message: String,
}

/// Outcome of [`delete_checked`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    /// Files deleted
    pub deleted_count: usize,
    /// Files that could not be deleted
    pub failed_count: usize,
    /// Groups left after pruning
    pub groups_remaining: usize,
    /// Total size of deleted files
    pub bytes_freed: u64,
    /// Directories removed because they became empty
    pub removed_dirs: Vec<PathBuf>,
    /// Per-file failures
    pub failures: Vec<DeleteFailure>,
}

impl DeletionSummary {
    /// Check if every deletion succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let freed = bytesize::ByteSize::b(self.bytes_freed);
        let mut text = if self.all_succeeded() {
            format!("Deleted {} file(s), freed {}", self.deleted_count, freed)
        } else {
            format!(
                "Deleted {} file(s), {} failed, freed {}",
                self.deleted_count, self.failed_count, freed
            )
        };
        if !self.removed_dirs.is_empty() {
            text.push_str(&format!(
                ", removed {} empty director{}",
                self.removed_dirs.len(),
                if self.removed_dirs.len() == 1 { "y" } else { "ies" }
            ));
        }
        text
    }
}

/// Delete one file.
///
/// # Arguments
///
/// * `path` - File to delete
/// * `expected_size` - Size recorded by the scan; checked when present
/// * `mode` - Permanent deletion or system trash
///
/// # Returns
///
/// The size of the deleted file.
///
/// # Errors
///
/// - `NotFound` / `PermissionDenied` / `Io` from the filesystem
/// - `Modified` if the size differs from `expected_size`
/// - `TrashFailed` if the platform trash rejects the file
pub fn delete_file(
    path: &Path,
    expected_size: Option<u64>,
    mode: DeleteMode,
) -> Result<u64, DeleteError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| DeleteError::from_io(path, e))?;
    let size = metadata.len();

    if let Some(expected) = expected_size {
        if expected != size {
            return Err(DeleteError::Modified {
                path: path.to_path_buf(),
                expected,
                actual: size,
            });
        }
    }

    match mode {
        DeleteMode::Permanent => {
            fs::remove_file(path).map_err(|e| DeleteError::from_io(path, e))?;
            log::info!("Permanently deleted: {} ({} bytes)", path.display(), size);
        }
        DeleteMode::Trash => {
            trash::delete(path).map_err(|e| DeleteError::TrashFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
        }
    }
    Ok(size)
}

/// Delete every checked entry of `set` and reconcile the model.
///
/// Never fails as a whole; see [`DeletionSummary::failures`].
pub fn delete_checked(set: &mut DuplicateSet, options: &DeleteOptions) -> DeletionSummary {
    let mut summary = DeletionSummary::default();
    let checked = set.checked_entries();
    log::info!(
        "Deleting {} checked file(s) ({:?})",
        checked.len(),
        options.mode
    );

    let mut deleted: HashSet<EntryId> = HashSet::new();
    let mut touched: BTreeSet<PathBuf> = BTreeSet::new();

    for entry in &checked {
        let path = entry.path();
        let expected = options.verify_size.then_some(entry.file().size);
        match delete_file(&path, expected, options.mode) {
            Ok(size) => {
                summary.deleted_count += 1;
                summary.bytes_freed += size;
                deleted.insert(entry.id());
                touched.insert(entry.file().directory.clone());
            }
            Err(e) => {
                log::warn!("Failed to delete {}: {}", path.display(), e);
                summary.failed_count += 1;
                summary.failures.push(DeleteFailure {
                    entry: entry.id(),
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    set.remove_entries(&deleted);
    let evicted = set.prune_singletons();
    if !evicted.is_empty() {
        log::debug!(
            "{} file(s) no longer have duplicates and left the set",
            evicted.len()
        );
    }

    if options.delete_empty_dirs {
        for dir in &touched {
            summary
                .removed_dirs
                .extend(remove_empty_dirs(dir, options.boundary.as_deref()));
        }
    }

    set.renumber();
    set.notify_set_changed();
    summary.groups_remaining = set.group_count();

    log::info!("{}", summary.summary());
    summary
}

/// Remove `start` if it is empty, then each parent that becomes empty.
///
/// Stops at the first directory that is missing or non-empty, at a
/// filesystem root (no parent), or at `boundary`, which is never removed.
/// Removal errors end the walk and are logged.
///
/// # Returns
///
/// The removed directories, deepest first.
pub fn remove_empty_dirs(start: &Path, boundary: Option<&Path>) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    let mut dir = start.to_path_buf();

    loop {
        if boundary.is_some_and(|b| b == dir) || !dir.is_dir() {
            break;
        }
        let Some(parent) = dir.parent().map(Path::to_path_buf) else {
            break;
        };

        match is_empty_dir(&dir) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                log::warn!("Cannot list {}: {}", dir.display(), e);
                break;
            }
        }
        if let Err(e) = fs::remove_dir(&dir) {
            log::warn!("Failed to remove empty directory {}: {}", dir.display(), e);
            break;
        }

        log::debug!("Removed empty directory {}", dir.display());
        removed.push(dir);
        dir = parent;
    }

    removed
}

fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}
