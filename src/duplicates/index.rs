//! Concurrent fingerprint buckets shared by both scan phases.
//!
//! # Overview
//!
//! A [`FingerprintIndex`] maps a [`Fingerprint`] to the files that produced
//! it. Many hashing workers call [`FingerprintIndex::record`] at once; each
//! call holds the shard lock for its bucket across the lookup-or-insert and
//! the push, so no append is ever lost.
//!
//! After every writer of a phase has finished, the pipeline calls
//! [`FingerprintIndex::prune_singletons`] to drop buckets that cannot hold a
//! duplicate.
//!
//! Bucket order is unspecified, and the order inside a bucket follows
//! hash completion order, which varies between runs. Sort before display.
//!
//! # Example
//!
//! ```
//! use dupecleaner::duplicates::FingerprintIndex;
//! use dupecleaner::scanner::{FileRef, Fingerprint};
//!
//! let index = FingerprintIndex::new();
//! let fp = Fingerprint::from_bytes(&[1, 2, 3]);
//! index.record(fp, FileRef::new("/a", "f1", 3));
//! index.record(fp, FileRef::new("/b", "f1", 3));
//! index.record(Fingerprint::from_bytes(&[9]), FileRef::new("/c", "f2", 1));
//!
//! assert_eq!(index.prune_singletons(), 1);
//! assert_eq!(index.bucket_count(), 1);
//! assert_eq!(index.file_count(), 2);
//! ```

use dashmap::DashMap;

use crate::scanner::{FileRef, Fingerprint};

/// Thread-safe `Fingerprint -> Vec<FileRef>` accumulator.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    buckets: DashMap<Fingerprint, Vec<FileRef>>,
}

impl FingerprintIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `file` to the bucket for `fingerprint`, creating it if absent.
    pub fn record(&self, fingerprint: Fingerprint, file: FileRef) {
        self.buckets.entry(fingerprint).or_default().push(file);
    }

    /// Remove every bucket holding fewer than two files.
    ///
    /// Must only be called once no `record` calls are in flight.
    ///
    /// # Returns
    ///
    /// The number of buckets removed.
    pub fn prune_singletons(&self) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|fingerprint, files| {
            if files.len() < 2 {
                log::trace!(
                    "Eliminated unique fingerprint {}: {:?}",
                    fingerprint,
                    files.first().map(FileRef::path)
                );
                false
            } else {
                true
            }
        });
        before - self.buckets.len()
    }

    /// Number of buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of files across all buckets.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.value().len()).sum()
    }

    /// Check whether the index holds no buckets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Files recorded under `fingerprint`, in completion order.
    #[must_use]
    pub fn files(&self, fingerprint: &Fingerprint) -> Option<Vec<FileRef>> {
        self.buckets.get(fingerprint).map(|bucket| bucket.clone())
    }

    /// Consume the index, yielding every bucket.
    ///
    /// Files within a bucket are sorted by (directory, name) and buckets by
    /// their first file, so the result does not depend on task scheduling.
    #[must_use]
    pub fn into_buckets(self) -> Vec<(Fingerprint, Vec<FileRef>)> {
        let mut buckets: Vec<_> = self
            .buckets
            .into_iter()
            .map(|(fingerprint, mut files)| {
                files.sort_by(|a, b| (&a.directory, &a.name).cmp(&(&b.directory, &b.name)));
                (fingerprint, files)
            })
            .collect();
        buckets.sort_by(|(_, a), (_, b)| {
            let key = |files: &[FileRef]| files.first().map(|f| (f.directory.clone(), f.name.clone()));
            key(a).cmp(&key(b))
        });
        buckets
    }

    /// Consume the index, yielding every recorded file.
    #[must_use]
    pub fn into_files(self) -> Vec<FileRef> {
        self.buckets.into_iter().flat_map(|(_, files)| files).collect()
    }
}
