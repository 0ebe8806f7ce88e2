//! Two-phase duplicate detection pipeline.
//!
//! # Overview
//!
//! A scan runs in two phases on a dedicated rayon pool:
//!
//! 1. **Fast scan**: list every regular file under the root and hash it with
//!    the fast algorithm. Fingerprints seen only once are dropped.
//! 2. **Slow scan**: re-hash the surviving candidates with the confirmation
//!    algorithm. Buckets that still hold two or more files become
//!    [`DuplicateGroup`](super::DuplicateGroup)s.
//!
//! The fast scan fully completes before the slow scan starts. Files that
//! cannot be read are logged, counted in [`ScanStats::failed_files`] and
//! left out of every group.
//!
//! # Cancellation
//!
//! The [`CancellationToken`] is checked before each per-file task starts.
//! Tasks already hashing run to completion, but once cancellation is seen
//! the scan ends in [`ScanOutcome::Cancelled`] and partial results are
//! discarded.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use dupecleaner::duplicates::{start_scan, ScanConfig, ScanOutcome};
//! use dupecleaner::progress::SilentProgress;
//! use dupecleaner::signal::CancellationToken;
//!
//! let handle = start_scan(
//!     Path::new("."),
//!     ScanConfig::default(),
//!     CancellationToken::new(),
//!     Arc::new(SilentProgress),
//! )
//! .unwrap();
//!
//! if let ScanOutcome::Completed(set, stats) = handle.join() {
//!     println!("{} duplicates in {} groups", set.entry_count(), stats.duplicate_groups);
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use super::groups::DuplicateSet;
use super::index::FingerprintIndex;
use crate::progress::{ProgressCallback, ScanPhase};
use crate::scanner::{FileRef, HashAlgorithm, Hasher, WalkError, Walker, DEFAULT_BUFFER_SIZE};
use crate::signal::CancellationToken;

/// Which hash a pipeline phase computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashStage {
    /// Cheap hash used to find candidates
    Fast,
    /// Stronger hash used to confirm candidates
    Confirm,
}

/// Configuration for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Algorithm for the fast scan.
    pub fast: HashAlgorithm,
    /// Algorithm for the slow (confirmation) scan.
    pub confirm: HashAlgorithm,
    /// Worker threads; 0 uses the available parallelism.
    pub threads: usize,
    /// Read buffer size for hashing.
    pub buffer_size: usize,
    /// Follow symbolic links while listing files.
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            fast: HashAlgorithm::Xxh3,
            confirm: HashAlgorithm::Blake3,
            threads: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
            follow_symlinks: false,
        }
    }
}

impl ScanConfig {
    /// Set the fast-scan algorithm.
    #[must_use]
    pub fn with_fast_hash(mut self, algorithm: HashAlgorithm) -> Self {
        self.fast = algorithm;
        self
    }

    /// Set the confirmation algorithm.
    #[must_use]
    pub fn with_confirm_hash(mut self, algorithm: HashAlgorithm) -> Self {
        self.confirm = algorithm;
        self
    }

    /// Set the number of worker threads (0 = available parallelism).
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the hashing read buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Follow symbolic links while listing files.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Algorithm used for a stage.
    #[must_use]
    pub fn algorithm_for(&self, stage: HashStage) -> HashAlgorithm {
        match stage {
            HashStage::Fast => self.fast,
            HashStage::Confirm => self.confirm,
        }
    }

    /// Hasher for a stage, using the configured buffer size.
    #[must_use]
    pub fn hasher_for(&self, stage: HashStage) -> Hasher {
        Hasher::new(self.algorithm_for(stage)).with_buffer_size(self.buffer_size)
    }
}

/// Lifecycle of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanState {
    /// Not started, or result discarded
    Idle,
    /// Hashing every file with the fast algorithm
    FastScanning,
    /// Confirming candidates with the strong algorithm
    SlowScanning,
    /// Finished with a duplicate set
    Completed,
    /// Stopped by cancellation
    Cancelled,
}

impl ScanState {
    /// Whether a worker is currently hashing.
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::FastScanning | Self::SlowScanning)
    }

    /// Whether the scan has ended.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::FastScanning,
            2 => Self::SlowScanning,
            3 => Self::Completed,
            4 => Self::Cancelled,
            _ => Self::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::FastScanning => 1,
            Self::SlowScanning => 2,
            Self::Completed => 3,
            Self::Cancelled => 4,
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::FastScanning => "fast scanning",
            Self::SlowScanning => "slow scanning",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Shared, lock-free scan state.
#[derive(Debug, Default)]
struct StateCell(AtomicU8);

impl StateCell {
    fn get(&self) -> ScanState {
        ScanState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: ScanState) {
        log::debug!("Scan state -> {}", state);
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }
}

/// Counters collected during a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Regular files listed under the root
    pub files_found: usize,
    /// Files successfully fast-hashed
    pub files_hashed: usize,
    /// Files skipped because hashing failed (either phase)
    pub failed_files: usize,
    /// Files sharing a fast fingerprint with another file
    pub fast_candidates: usize,
    /// Files in confirmed duplicate groups
    pub duplicate_files: usize,
    /// Confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Space held by extra copies
    pub wasted_bytes: u64,
    /// Wall-clock duration of the scan
    pub elapsed: Duration,
}

/// Result of a scan.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Both phases finished
    Completed(DuplicateSet, ScanStats),
    /// Cancellation was requested; no groups are reported
    Cancelled,
}

impl ScanOutcome {
    /// Whether the scan was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors that prevent a scan from starting.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Root path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Root path is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Worker pool could not be created
    #[error("Failed to create worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Scan thread could not be spawned
    #[error("Failed to spawn scan thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl From<WalkError> for ScanError {
    fn from(err: WalkError) -> Self {
        match err {
            WalkError::NotFound(path) => Self::PathNotFound(path),
            WalkError::NotADirectory(path) => Self::NotADirectory(path),
        }
    }
}

/// Handle to a scan running on a background thread.
pub struct ScanHandle {
    thread: JoinHandle<ScanOutcome>,
    state: Arc<StateCell>,
    token: CancellationToken,
}

impl fmt::Debug for ScanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanHandle")
            .field("state", &self.state())
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl ScanHandle {
    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ScanState {
        self.state.get()
    }

    /// Request cancellation. Returns immediately.
    pub fn cancel(&self) {
        crate::signal::request_cancel(&self.token);
    }

    /// Whether the worker thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the scan to end.
    ///
    /// A panic on the worker thread is propagated to the caller.
    pub fn join(self) -> ScanOutcome {
        match self.thread.join() {
            Ok(outcome) => outcome,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

/// Start a scan of `root` on a background thread.
///
/// Progress events go to `sink`; the terminal
/// [`on_finished`](ProgressCallback::on_finished) event fires exactly once.
///
/// # Errors
///
/// - `PathNotFound` / `NotADirectory` if the root is invalid
/// - `ThreadPool` / `Spawn` if the workers cannot be created
pub fn start_scan(
    root: &Path,
    config: ScanConfig,
    token: CancellationToken,
    sink: Arc<dyn ProgressCallback>,
) -> Result<ScanHandle, ScanError> {
    let pipeline = Pipeline::new(root, config, token.clone(), sink)?;
    let state = Arc::clone(&pipeline.state);

    let thread = std::thread::Builder::new()
        .name("dupecleaner-scan".to_string())
        .spawn(move || pipeline.run())
        .map_err(ScanError::Spawn)?;

    Ok(ScanHandle {
        thread,
        state,
        token,
    })
}

/// Run a scan of `root` on the calling thread.
///
/// Same pipeline as [`start_scan`] without the background thread.
///
/// # Errors
///
/// Same as [`start_scan`].
pub fn scan(
    root: &Path,
    config: ScanConfig,
    token: CancellationToken,
    sink: Arc<dyn ProgressCallback>,
) -> Result<ScanOutcome, ScanError> {
    Ok(Pipeline::new(root, config, token, sink)?.run())
}

struct Pipeline {
    root: PathBuf,
    config: ScanConfig,
    token: CancellationToken,
    sink: Arc<dyn ProgressCallback>,
    state: Arc<StateCell>,
    pool: rayon::ThreadPool,
}

impl Pipeline {
    fn new(
        root: &Path,
        config: ScanConfig,
        token: CancellationToken,
        sink: Arc<dyn ProgressCallback>,
    ) -> Result<Self, ScanError> {
        Walker::new(root).validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("dupecleaner-hash-{i}"))
            .build()?;

        Ok(Self {
            root: root.to_path_buf(),
            config,
            token,
            sink,
            state: Arc::new(StateCell::default()),
            pool,
        })
    }

    fn run(self) -> ScanOutcome {
        let started = Instant::now();
        let mut stats = ScanStats::default();

        self.state.set(ScanState::FastScanning);
        log::info!(
            "Scanning {} ({} fast hash, {} workers)",
            self.root.display(),
            self.config.fast,
            self.pool.current_num_threads()
        );

        self.sink.on_phase_start(ScanPhase::FastScan, 0);
        let files: Vec<FileRef> = Walker::new(&self.root)
            .with_follow_symlinks(self.config.follow_symlinks)
            .with_cancellation(self.token.clone())
            .walk()
            .collect();
        stats.files_found = files.len();
        log::info!("Fast scan: found {} files", files.len());

        let Some(fast) = self.hash_phase(ScanPhase::FastScan, HashStage::Fast, files, &mut stats)
        else {
            return self.finish(ScanOutcome::Cancelled);
        };
        stats.fast_candidates = fast.file_count();

        self.state.set(ScanState::SlowScanning);
        log::info!(
            "Slow scan: confirming {} candidates in {} buckets with {}",
            stats.fast_candidates,
            fast.bucket_count(),
            self.config.confirm
        );

        let candidates = fast.into_files();
        self.sink
            .on_phase_start(ScanPhase::SlowScan, candidates.len());
        let Some(confirmed) =
            self.hash_phase(ScanPhase::SlowScan, HashStage::Confirm, candidates, &mut stats)
        else {
            return self.finish(ScanOutcome::Cancelled);
        };

        let set = DuplicateSet::from_buckets(Some(self.root.clone()), confirmed.into_buckets());
        stats.duplicate_groups = set.group_count();
        stats.duplicate_files = set.entry_count();
        stats.wasted_bytes = set.wasted_bytes();
        stats.elapsed = started.elapsed();

        log::info!(
            "Scan complete: {} duplicates in {} groups ({} files skipped) in {:.2?}",
            stats.duplicate_files,
            stats.duplicate_groups,
            stats.failed_files,
            stats.elapsed
        );
        self.finish(ScanOutcome::Completed(set, stats))
    }

    /// Hash `files` in parallel and return the pruned index, or `None` if
    /// the scan was cancelled.
    fn hash_phase(
        &self,
        phase: ScanPhase,
        stage: HashStage,
        files: Vec<FileRef>,
        stats: &mut ScanStats,
    ) -> Option<FingerprintIndex> {
        let hasher = self.config.hasher_for(stage);
        let index = FingerprintIndex::new();
        let total = files.len();
        let completed = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        self.pool.install(|| {
            files.into_par_iter().for_each(|file| {
                if self.token.is_cancelled() {
                    return;
                }

                let path = file.path();
                match hasher.hash_file(&path) {
                    Ok(fingerprint) => {
                        log::trace!("{} {}: {}", hasher.algorithm(), path.display(), fingerprint);
                        index.record(fingerprint, file);
                    }
                    Err(e) => {
                        log::warn!("Skipping file: {}", e);
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                self.sink.on_progress(phase, done, total);
            });
        });
        self.sink.on_phase_end(phase);

        if self.token.is_cancelled() {
            log::info!("{}: cancelled, discarding partial results", phase);
            return None;
        }

        let failed = failed.into_inner();
        stats.failed_files += failed;
        if stage == HashStage::Fast {
            stats.files_hashed = total - failed;
        }

        let pruned = index.prune_singletons();
        log::debug!(
            "{}: {} unique fingerprints eliminated, {} buckets remain",
            phase,
            pruned,
            index.bucket_count()
        );
        Some(index)
    }

    fn finish(&self, outcome: ScanOutcome) -> ScanOutcome {
        self.state.set(if outcome.is_cancelled() {
            ScanState::Cancelled
        } else {
            ScanState::Completed
        });
        self.sink.on_finished(&outcome);
        outcome
    }
}
