//! Scanner module for file enumeration and content fingerprinting.
//!
//! This module provides functionality for:
//! - Recursive directory listing using walkdir
//! - Streaming content hashing with a selectable algorithm
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and [`FileRef`] discovery
//! - [`hasher`]: Streaming fingerprints (XXH3, MD5, SHA-1, BLAKE3)
//! - [`hardlink`]: Physical file identity, so hard links and followed
//!   symlinks are listed once
//!
//! # Example
//!
//! ```no_run
//! use dupecleaner::scanner::{HashAlgorithm, Hasher, Walker};
//! use std::path::Path;
//!
//! let hasher = Hasher::new(HashAlgorithm::Blake3);
//! for file in Walker::new(Path::new(".")).walk() {
//!     match hasher.hash_file(&file.path()) {
//!         Ok(fp) => println!("{} {}", fp, file.path().display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hardlink;
pub mod hasher;
pub mod walker;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// Re-export main types
pub use hardlink::HardlinkTracker;
pub use hasher::{Fingerprint, HashAlgorithm, Hasher, DEFAULT_BUFFER_SIZE};
pub use walker::Walker;

/// A file discovered during a scan.
///
/// Identifies the file by its containing directory and name, plus the size
/// observed at discovery time. Immutable for the lifetime of a scan result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    /// Directory containing the file
    pub directory: PathBuf,
    /// File name within `directory`
    pub name: String,
    /// File size in bytes at discovery time
    pub size: u64,
}

impl FileRef {
    /// Create a new FileRef.
    ///
    /// # Arguments
    ///
    /// * `directory` - Directory containing the file
    /// * `name` - File name
    /// * `size` - File size in bytes
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, name: impl Into<String>, size: u64) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
            size,
        }
    }

    /// Build a FileRef from a full path.
    ///
    /// Returns `None` for paths without a parent directory or file name.
    #[must_use]
    pub fn from_path(path: &Path, size: u64) -> Option<Self> {
        let directory = path.parent()?;
        let name = path.file_name()?;
        Some(Self::new(
            directory,
            name.to_string_lossy().into_owned(),
            size,
        ))
    }

    /// Full path of the file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.name)
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum WalkError {
    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while opening or reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while hashing `path`.
    #[must_use]
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Path of the file that failed to hash.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Io { path: p, .. } => p,
        }
    }
}
