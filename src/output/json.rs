//! JSON output formatter for duplicate scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "number": 1,
//!       "fingerprint": "af1349b9...",
//!       "size": 1024,
//!       "files": [
//!         { "path": "/a/file.txt", "checked": false, "kept": true },
//!         { "path": "/b/file.txt", "checked": true, "kept": false }
//!       ]
//!     }
//!   ],
//!   "summary": {
//!     "files_found": 100,
//!     "duplicate_groups": 1,
//!     "duplicate_files": 2,
//!     "wasted_bytes": 1024,
//!     "scan_duration_ms": 12,
//!     "exit_code": 0,
//!     "exit_code_name": "DC000"
//!   },
//!   "deletion": null
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::actions::DeletionSummary;
use crate::duplicates::{DuplicateEntry, DuplicateGroup, ScanStats};
use crate::error::ExitCode;

/// One file of a duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonEntry {
    /// Full path of the file
    pub path: String,
    /// Marked for deletion
    pub checked: bool,
    /// Protected from deletion
    pub kept: bool,
}

impl From<&DuplicateEntry> for JsonEntry {
    fn from(entry: &DuplicateEntry) -> Self {
        Self {
            path: entry.path().to_string_lossy().into_owned(),
            checked: entry.is_checked(),
            kept: entry.is_kept(),
        }
    }
}

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Group number (1-based)
    pub number: usize,
    /// Confirmation fingerprint as lowercase hex
    pub fingerprint: String,
    /// Size of one copy in bytes
    pub size: u64,
    /// Members sorted by directory, then name
    pub files: Vec<JsonEntry>,
}

impl From<&DuplicateGroup> for JsonDuplicateGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            number: group.number(),
            fingerprint: group.fingerprint().to_hex(),
            size: group.size(),
            files: group.entries().iter().map(JsonEntry::from).collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Regular files listed under the root
    pub files_found: usize,
    /// Files skipped because they could not be hashed
    pub failed_files: usize,
    /// Files that survived the fast scan
    pub fast_candidates: usize,
    /// Confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Files in confirmed duplicate groups
    pub duplicate_files: usize,
    /// Space held by extra copies
    pub wasted_bytes: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DC000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from scan statistics and an exit code.
    #[must_use]
    pub fn from_stats(stats: &ScanStats, exit_code: ExitCode) -> Self {
        Self {
            files_found: stats.files_found,
            failed_files: stats.failed_files,
            fast_candidates: stats.fast_candidates,
            duplicate_groups: stats.duplicate_groups,
            duplicate_files: stats.duplicate_files,
            wasted_bytes: stats.wasted_bytes,
            scan_duration_ms: stats.elapsed.as_millis() as u64,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Groups remaining in the model
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
    /// Deletion results, when a deletion ran
    pub deletion: Option<DeletionSummary>,
}

impl JsonOutput {
    /// Create a new JSON output.
    ///
    /// # Example
    ///
    /// ```
    /// use dupecleaner::duplicates::ScanStats;
    /// use dupecleaner::error::ExitCode;
    /// use dupecleaner::output::JsonOutput;
    ///
    /// let output = JsonOutput::new(&[], &ScanStats::default(), ExitCode::NoDuplicates);
    /// assert!(output.duplicates.is_empty());
    /// assert_eq!(output.summary.exit_code, 2);
    /// ```
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], stats: &ScanStats, exit_code: ExitCode) -> Self {
        Self {
            duplicates: groups.iter().map(JsonDuplicateGroup::from).collect(),
            summary: JsonSummary::from_stats(stats, exit_code),
            deletion: None,
        }
    }

    /// Attach the result of a deletion pass.
    #[must_use]
    pub fn with_deletion(mut self, deletion: DeletionSummary) -> Self {
        self.deletion = Some(deletion);
        self
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), JsonOutputError> {
        let json = self.to_json_pretty()?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
