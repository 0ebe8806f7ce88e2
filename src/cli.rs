//! Command-line interface definitions for dupecleaner.
//!
//! This module defines all CLI arguments, subcommands, and options using the
//! clap derive API. Global options (verbosity, config file, JSON errors) apply
//! to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # List duplicates under ~/Pictures
//! dupecleaner scan ~/Pictures
//!
//! # Keep the copies in ~/Pictures/originals, delete the rest, tidy empty dirs
//! dupecleaner scan ~/Pictures --keep-dir ~/Pictures/originals --delete --delete-empty-dirs
//!
//! # JSON for scripting, MD5 fast pass and SHA-1 confirmation
//! dupecleaner scan ~/Pictures --output json --fast-hash md5 --confirm-hash sha1
//! ```

use std::path::PathBuf;

use bytesize::ByteSize;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::scanner::HashAlgorithm;

/// Find duplicate files by content and delete the extra copies.
///
/// Files are matched with a fast hash first, then confirmed with a strong
/// hash. Use --keep-dir / --check-dir to choose copies and --delete to
/// remove the checked ones.
#[derive(Debug, Parser)]
#[command(name = "dupecleaner")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (default: platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate files
    Scan(ScanArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan for duplicates
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Keep the copy stored in this directory in every group that has one
    ///
    /// Can be specified multiple times. Other copies in those groups are
    /// checked for deletion.
    #[arg(long = "keep-dir", value_name = "DIR")]
    pub keep_dirs: Vec<PathBuf>,

    /// Check every copy stored in this directory for deletion
    ///
    /// Copies that are the last unchecked one of their group are skipped.
    #[arg(long = "check-dir", value_name = "DIR")]
    pub check_dirs: Vec<PathBuf>,

    /// Delete the checked files after the scan
    #[arg(long)]
    pub delete: bool,

    /// Remove directories left empty by the deletion
    #[arg(long, requires = "delete")]
    pub delete_empty_dirs: bool,

    /// Move files to the system trash instead of deleting them permanently
    #[arg(long, requires = "delete")]
    pub trash: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Algorithm for the fast scan
    #[arg(long, value_enum, value_name = "ALGORITHM")]
    pub fast_hash: Option<HashAlgorithm>,

    /// Algorithm confirming fast-scan matches
    #[arg(long, value_enum, value_name = "ALGORITHM")]
    pub confirm_hash: Option<HashAlgorithm>,

    /// Hashing threads (0 = all cores)
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Read buffer size for hashing (e.g., 64KiB, 1MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub buffer_size: Option<u64>,

    /// Follow symbolic links during the scan
    #[arg(long)]
    pub follow_symlinks: bool,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a buffer size such as `65536`, `64KiB` or `1 MB` into bytes.
///
/// Units are case-insensitive; decimal (`KB`, `MB`) and binary (`KiB`,
/// `MiB`) suffixes are both accepted.
///
/// ```
/// use dupecleaner::cli::parse_size;
///
/// assert_eq!(parse_size("64KiB").unwrap(), 65_536);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// ```
///
/// # Errors
///
/// Returns a message naming the rejected input if it is empty, zero, or
/// not a number with a known unit.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let size = s
        .parse::<ByteSize>()
        .map_err(|e| format!("Invalid size '{s}': {e}"))?
        .as_u64();
    if size == 0 {
        return Err("Size must be greater than zero".to_string());
    }
    Ok(size)
}
