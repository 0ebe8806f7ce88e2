//! dupecleaner - duplicate file finder and cleaner
//!
//! Finds files with identical content under a directory using a two-phase
//! hash pipeline (fast hash, then a strong confirmation hash), lets the
//! caller choose which copies to keep or delete, and reconciles that choice
//! with the filesystem.
//!
//! # Architecture
//!
//! - [`scanner`]: file listing and streaming content fingerprints
//! - [`duplicates`]: fingerprint buckets, the scan pipeline and the
//!   selection model over confirmed groups
//! - [`actions`]: deletion of checked files and empty-directory cleanup
//! - [`progress`], [`signal`]: progress sinks and cooperative cancellation
//! - [`cli`], [`config`], [`output`], [`logging`], [`error`]: the command-line
//!   front end
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use dupecleaner::actions::{delete_checked, DeleteOptions};
//! use dupecleaner::duplicates::{start_scan, ScanConfig, ScanOutcome};
//! use dupecleaner::progress::SilentProgress;
//! use dupecleaner::signal::CancellationToken;
//!
//! let root = Path::new("/data");
//! let handle = start_scan(root, ScanConfig::default(), CancellationToken::new(), Arc::new(SilentProgress))?;
//! if let ScanOutcome::Completed(mut set, _) = handle.join() {
//!     set.keep_directory(&root.join("originals"));
//!     let summary = delete_checked(&mut set, &DeleteOptions::default().with_delete_empty_dirs(true));
//!     println!("{}", summary.summary());
//! }
//! # Ok::<(), dupecleaner::duplicates::ScanError>(())
//! ```

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::actions::{delete_checked, DeletionSummary};
use crate::cli::{Cli, Commands, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::duplicates::{start_scan, DuplicateSet, ScanOutcome, ScanStats};
use crate::error::ExitCode;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::{Progress, ProgressCallback, SilentProgress};

/// Run the application for parsed CLI arguments.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the scan cannot start, or
/// output cannot be written. Per-file hash and delete failures are not
/// errors; they are reported in the output and exit code.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = match cli.config {
        Some(ref path) => Config::try_load_from_path(path)
            .with_context(|| format!("Invalid configuration file {}", path.display()))?,
        None => Config::load(),
    };
    log::debug!("Configuration: {:?}", config);

    match cli.command {
        Commands::Scan(ref args) => run_scan(args, config, cli.quiet),
    }
}

fn run_scan(args: &ScanArgs, mut config: Config, quiet: bool) -> anyhow::Result<ExitCode> {
    config.merge_scan_args(args);
    let token = signal::install_handler()?;

    let sink: Arc<dyn ProgressCallback> = if quiet || args.output == OutputFormat::Json {
        Arc::new(SilentProgress)
    } else {
        Arc::new(Progress::new(false))
    };

    let root = resolve(&args.path)?;
    let handle = start_scan(&root, config.scan_config(), token, sink)
        .with_context(|| format!("Failed to scan {}", args.path.display()))?;

    let (mut set, stats) = match handle.join() {
        ScanOutcome::Completed(set, stats) => (set, stats),
        ScanOutcome::Cancelled => {
            log::info!("Scan cancelled");
            return Ok(ExitCode::Interrupted);
        }
    };

    apply_selection(&set, args)?;

    let mut deletion = None;
    if args.delete && !set.is_empty() {
        let checked = set.checked_entries();
        if checked.is_empty() {
            log::info!("Nothing is checked for deletion");
        } else if args.yes || confirm_deletion(checked.len(), quiet)? {
            let options = config.delete_options(&root);
            deletion = Some(delete_checked(&mut set, &options));
        } else {
            log::info!("Deletion skipped");
        }
    }

    let exit_code = exit_code_for(&stats, deletion.as_ref());
    write_results(args.output, &set, &stats, deletion, exit_code, quiet)?;
    Ok(exit_code)
}

/// Absolute form of a path argument, so `./data` and `/home/me/data` name
/// the same directory as the paths recorded by the scan.
fn resolve(path: &Path) -> anyhow::Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Invalid path {}", path.display()))
}

fn apply_selection(set: &DuplicateSet, args: &ScanArgs) -> anyhow::Result<()> {
    for dir in &args.keep_dirs {
        let touched = set.keep_directory(&resolve(dir)?);
        if touched == 0 {
            log::warn!("No duplicates found in {}", dir.display());
        }
    }
    for dir in &args.check_dirs {
        let (checked, rejected) = set.check_directory(&resolve(dir)?);
        log::info!("Checked {} file(s) in {}", checked, dir.display());
        if rejected > 0 {
            log::warn!(
                "{} file(s) in {} left unchecked: they are the last unchecked copy of their group",
                rejected,
                dir.display()
            );
        }
    }
    Ok(())
}

fn exit_code_for(stats: &ScanStats, deletion: Option<&DeletionSummary>) -> ExitCode {
    match deletion {
        Some(summary) if !summary.all_succeeded() => ExitCode::PartialSuccess,
        Some(_) => ExitCode::Success,
        None if stats.duplicate_groups == 0 => ExitCode::NoDuplicates,
        None => ExitCode::Success,
    }
}

fn write_results(
    format: OutputFormat,
    set: &DuplicateSet,
    stats: &ScanStats,
    deletion: Option<DeletionSummary>,
    exit_code: ExitCode,
    quiet: bool,
) -> anyhow::Result<()> {
    let groups = set.groups();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Json => {
            let mut output = JsonOutput::new(&groups, stats, exit_code);
            if let Some(summary) = deletion {
                output = output.with_deletion(summary);
            }
            output.write_to(&mut out)?;
        }
        OutputFormat::Text => {
            if let Some(summary) = deletion {
                for failure in &summary.failures {
                    writeln!(out, "Failed: {}: {}", failure.path.display(), failure.message)?;
                }
                writeln!(out, "{}", summary.summary())?;
                if !groups.is_empty() && !quiet {
                    writeln!(out)?;
                }
            }
            if !quiet {
                TextOutput::new(&groups).write_to(&mut out)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Ask on stdin before deleting.
///
/// Refuses when stdin is not a terminal, so scripts must pass `--yes`.
fn confirm_deletion(count: usize, quiet: bool) -> anyhow::Result<bool> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        anyhow::bail!("Refusing to delete {count} file(s) without confirmation; pass --yes");
    }

    let mut stderr = io::stderr();
    if !quiet {
        write!(stderr, "Delete {count} checked file(s)? [y/N] ")?;
        stderr.flush()?;
    }

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
