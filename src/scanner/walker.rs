//! Recursive directory listing using walkdir.
//!
//! # Overview
//!
//! The [`Walker`] enumerates every regular file under a root directory and
//! produces a [`FileRef`] for each. Entries that cannot be read (permission
//! denied, vanished mid-walk) are logged and skipped; they never abort the
//! listing. Symbolic links are not followed unless requested.
//!
//! Each physical file is yielded at most once: a second directory entry for
//! an already listed file (a hard link, or the same file reached through a
//! followed symlink) is skipped, so no file can be grouped with itself.
//!
//! # Example
//!
//! ```no_run
//! use dupecleaner::scanner::Walker;
//! use std::path::Path;
//!
//! let files: Vec<_> = Walker::new(Path::new(".")).walk().collect();
//! println!("{} files", files.len());
//! ```

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{FileRef, HardlinkTracker, WalkError};
use crate::signal::CancellationToken;

/// Recursive file enumerator.
#[derive(Debug, Clone)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Follow symbolic links during traversal
    follow_symlinks: bool,
    /// Optional token that stops the listing early
    cancel: Option<CancellationToken>,
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            follow_symlinks: false,
            cancel: None,
        }
    }

    /// Follow symbolic links. walkdir detects link cycles and reports them
    /// as errors, which are skipped like any other unreadable entry.
    ///
    /// Ignored where file identity is unavailable, since a followed link
    /// could then list one file twice.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        if follow && !HardlinkTracker::is_supported() {
            log::warn!("Following symlinks is not supported on this platform; ignoring");
        }
        self.follow_symlinks = follow && HardlinkTracker::is_supported();
        self
    }

    /// Stop yielding files once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Root path of this walker.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that the root exists and is a directory.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the root does not exist
    /// - `NotADirectory` if the root is a file
    pub fn validate(&self) -> Result<(), WalkError> {
        if !self.root.exists() {
            return Err(WalkError::NotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(WalkError::NotADirectory(self.root.clone()));
        }
        Ok(())
    }

    /// Iterate over every regular file below the root.
    ///
    /// Entries are visited in file-name order, so when one file is reachable
    /// under several names the first name in that order is the one yielded.
    pub fn walk(&self) -> impl Iterator<Item = FileRef> + '_ {
        let mut tracker = HardlinkTracker::new();

        WalkDir::new(&self.root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .take_while(move |_| !self.is_cancelled())
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(move |entry| {
                // Follows the link when links are followed
                let metadata = match entry.metadata() {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        log::warn!("Failed to read metadata for {}: {}", entry.path().display(), e);
                        return None;
                    }
                };
                if tracker.is_hardlink(&metadata) {
                    log::debug!("Skipping second link to a listed file: {}", entry.path().display());
                    return None;
                }
                let size = metadata.len();
                let file = FileRef::from_path(entry.path(), size);
                if let Some(ref file) = file {
                    log::trace!("Discovered {} ({} bytes)", file.path().display(), size);
                }
                file
            })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}
