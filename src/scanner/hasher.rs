//! Streaming file hasher with selectable algorithms.
//!
//! # Overview
//!
//! The [`Hasher`] computes a [`Fingerprint`] over a file's entire contents
//! by streaming it through a fixed-size buffer, so memory use does not grow
//! with file size. The digest is chosen with [`HashAlgorithm`]; the scan
//! pipeline uses a cheap algorithm for its fast pass and a stronger one to
//! confirm candidates.
//!
//! # Example
//!
//! ```no_run
//! use dupecleaner::scanner::{HashAlgorithm, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new(HashAlgorithm::Xxh3);
//! let fingerprint = hasher.hash_file(Path::new("Cargo.toml")).unwrap();
//! println!("{}", fingerprint);
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest as Md5Digest, Md5};
use serde::{Deserialize, Serialize};
use sha1::{Digest as Sha1Digest, Sha1};
use xxhash_rust::xxh3::Xxh3;

use super::HashError;

/// Default read buffer size for streaming (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Widest digest produced by any supported algorithm, in bytes.
const MAX_FINGERPRINT_LEN: usize = 32;

/// Content digest algorithm.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// XXH3 128-bit (non-cryptographic, fastest)
    #[default]
    Xxh3,
    /// MD5 (128-bit)
    Md5,
    /// SHA-1 (160-bit)
    Sha1,
    /// BLAKE3 (256-bit)
    Blake3,
}

impl HashAlgorithm {
    /// Width of the fingerprint in bytes.
    #[must_use]
    pub fn output_len(self) -> usize {
        match self {
            Self::Xxh3 | Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Blake3 => 32,
        }
    }

    /// Lowercase algorithm name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Xxh3 => "xxh3",
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fixed-width content digest.
///
/// Stored inline so it is `Copy` and cheap to use as a map key. Two
/// fingerprints are only comparable when produced by the same algorithm.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    len: u8,
    bytes: [u8; MAX_FINGERPRINT_LEN],
}

impl Fingerprint {
    /// Build a fingerprint from raw digest bytes.
    ///
    /// Digests longer than 32 bytes are truncated.
    #[must_use]
    pub fn from_bytes(digest: &[u8]) -> Self {
        let len = digest.len().min(MAX_FINGERPRINT_LEN);
        let mut bytes = [0u8; MAX_FINGERPRINT_LEN];
        bytes[..len].copy_from_slice(&digest[..len]);
        Self {
            len: len as u8,
            bytes,
        }
    }

    /// Digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Lowercase hexadecimal rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.as_bytes().iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Running digest state for one file.
enum DigestState {
    Xxh3(Box<Xxh3>),
    Md5(Md5),
    Sha1(Sha1),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Xxh3 => Self::Xxh3(Box::new(Xxh3::new())),
            HashAlgorithm::Md5 => Self::Md5(Md5::new()),
            HashAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Xxh3(h) => h.update(data),
            Self::Md5(h) => Md5Digest::update(h, data),
            Self::Sha1(h) => Sha1Digest::update(h, data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize(self) -> Fingerprint {
        match self {
            Self::Xxh3(h) => Fingerprint::from_bytes(&h.digest128().to_le_bytes()),
            Self::Md5(h) => Fingerprint::from_bytes(&Md5Digest::finalize(h)),
            Self::Sha1(h) => Fingerprint::from_bytes(&Sha1Digest::finalize(h)),
            Self::Blake3(h) => Fingerprint::from_bytes(h.finalize().as_bytes()),
        }
    }
}

/// Streaming content hasher.
///
/// Holds no per-file state, so one instance can be shared by every worker
/// of a scan phase.
#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    buffer_size: usize,
}

impl Hasher {
    /// Create a hasher for the given algorithm with the default buffer size.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Set the read buffer size (minimum 1 byte).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Algorithm used by this hasher.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash the full contents of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or a read fails
    /// part way through (e.g. the file was deleted or locked during the scan).
    pub fn hash_file(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        self.hash_reader(file)
            .map_err(|e| HashError::from_io(path, e))
    }

    /// Hash everything readable from `reader`.
    ///
    /// # Errors
    ///
    /// Propagates any read error other than `Interrupted`.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<Fingerprint> {
        let mut state = DigestState::new(self.algorithm);
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => state.update(&buffer[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(state.finalize())
    }
}
