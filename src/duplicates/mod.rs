//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Concurrent fingerprint bucketing ([`FingerprintIndex`])
//! - The fast/slow hashing pipeline ([`start_scan`])
//! - The selection model over confirmed groups ([`DuplicateSet`])

pub mod finder;
pub mod groups;
pub mod index;

pub use finder::{
    scan, start_scan, HashStage, ScanConfig, ScanError, ScanHandle, ScanOutcome, ScanState,
    ScanStats,
};
pub use groups::{
    DuplicateEntry, DuplicateGroup, DuplicateSet, EntryId, SelectionError, SelectionObserver,
};
pub use index::FingerprintIndex;
