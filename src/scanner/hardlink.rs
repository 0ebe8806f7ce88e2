//! Physical file identity, so one file is never listed twice.
//!
//! A file can be reached through several directory entries: hard links to
//! the same inode, or a followed symlink to a directory that is also walked
//! directly. Those entries are the same data, not copies of it, and deleting
//! one of them may delete the only copy.
//!
//! # Platform Support
//!
//! - **Unix**: (device id, inode) from the file metadata
//! - **Other**: not supported, every entry is treated as a distinct file

use std::collections::HashSet;
use std::fs::Metadata;

/// Remembers the physical files seen during one walk.
///
/// Not thread-safe; the walker owns one per listing.
#[derive(Debug, Default)]
pub struct HardlinkTracker {
    seen: HashSet<InodeKey>,
}

impl HardlinkTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `metadata` and report whether its file was already seen.
    ///
    /// Always `false` where identity is not available.
    pub fn is_hardlink(&mut self, metadata: &Metadata) -> bool {
        match InodeKey::from_metadata(metadata) {
            Some(key) => !self.seen.insert(key),
            None => false,
        }
    }

    /// Number of distinct files recorded.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Whether file identity can be read on this platform.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(unix)
    }
}

#[cfg_attr(not(unix), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InodeKey {
    dev: u64,
    ino: u64,
}

impl InodeKey {
    #[cfg(unix)]
    fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }
}
