//! File actions module.
//!
//! Applies a duplicate selection to the filesystem:
//! - Permanent deletion or move to the system trash
//! - Size verification of each file before it is removed
//! - Removal of directories emptied by the deletions
//!
//! ```no_run
//! use dupecleaner::actions::{delete_checked, DeleteMode, DeleteOptions};
//! # fn demo(set: &mut dupecleaner::duplicates::DuplicateSet) {
//! let options = DeleteOptions::default().with_mode(DeleteMode::Trash);
//! let summary = delete_checked(set, &options);
//! # }
//! ```

pub mod delete;

pub use delete::{
    delete_checked, delete_file, remove_empty_dirs, DeleteError, DeleteFailure, DeleteMode,
    DeleteOptions, DeletionSummary,
};
