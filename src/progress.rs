//! Progress reporting for the scan pipeline.
//!
//! The pipeline reports to a [`ProgressCallback`] sink. [`Progress`] renders
//! one indicatif bar per hashing phase; [`SilentProgress`] discards every
//! event and is what tests and `--quiet` runs use.
//!
//! Events for one phase arrive from many worker threads at once, so every
//! implementation must be `Send + Sync` and tolerate out-of-order
//! `completed` values.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::duplicates::ScanOutcome;

/// Hashing phase of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanPhase {
    /// Fast hash over every enumerated file
    FastScan,
    /// Confirmation hash over fast-pass candidates
    SlowScan,
}

impl ScanPhase {
    /// Short phase name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FastScan => "fast scan",
            Self::SlowScan => "slow scan",
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress sink for the scan pipeline.
///
/// Implement this trait to receive progress updates while a scan runs.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - The phase starting
    /// * `total` - Number of files the phase will process (0 while the
    ///   fast scan is still enumerating)
    fn on_phase_start(&self, phase: ScanPhase, total: usize);

    /// Called once per processed file, whether hashing succeeded or not.
    ///
    /// # Arguments
    ///
    /// * `phase` - Current phase
    /// * `completed` - Files completed so far in this phase
    /// * `total` - Files known to the phase so far
    fn on_progress(&self, phase: ScanPhase, completed: usize, total: usize);

    /// Called when a phase ends, including after cancellation.
    fn on_phase_end(&self, phase: ScanPhase);

    /// Terminal event, delivered exactly once per scan.
    fn on_finished(&self, _outcome: &ScanOutcome) {}
}

/// Sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_phase_start(&self, _phase: ScanPhase, _total: usize) {}
    fn on_progress(&self, _phase: ScanPhase, _completed: usize, _total: usize) {}
    fn on_phase_end(&self, _phase: ScanPhase) {}
}

/// Progress reporter using indicatif.
///
/// Shows a bar per phase. The fast-scan bar starts as a spinner because the
/// file count is unknown until enumeration finishes.
pub struct Progress {
    multi: MultiProgress,
    fast: Mutex<Option<ProgressBar>>,
    slow: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupecleaner::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            fast: Mutex::new(None),
            slow: Mutex::new(None),
            quiet,
        }
    }

    fn bar(&self, phase: ScanPhase) -> MutexGuard<'_, Option<ProgressBar>> {
        let slot = match phase {
            ScanPhase::FastScan => &self.fast,
            ScanPhase::SlowScan => &self.slow,
        };
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: ScanPhase, total: usize) {
        if self.quiet {
            return;
        }

        let pb = if total == 0 {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::bar_style());
            pb
        };
        pb.set_message(match phase {
            ScanPhase::FastScan => "Fast scan",
            ScanPhase::SlowScan => "Slow scan",
        });
        *self.bar(phase) = Some(pb);
    }

    fn on_progress(&self, phase: ScanPhase, completed: usize, total: usize) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *self.bar(phase) {
            if total > 0 && pb.length() != Some(total as u64) {
                pb.set_length(total as u64);
                pb.set_style(Self::bar_style());
            }
            // Workers finish out of order; never move the bar backwards
            if completed as u64 > pb.position() {
                pb.set_position(completed as u64);
            }
        }
    }

    fn on_phase_end(&self, phase: ScanPhase) {
        if self.quiet {
            return;
        }

        if let Some(pb) = self.bar(phase).take() {
            pb.finish_with_message(match phase {
                ScanPhase::FastScan => "Fast scan complete",
                ScanPhase::SlowScan => "Slow scan complete",
            });
        }
    }

    fn on_finished(&self, outcome: &ScanOutcome) {
        if self.quiet {
            return;
        }

        // Drop any bar left behind by a cancelled phase
        for phase in [ScanPhase::FastScan, ScanPhase::SlowScan] {
            if let Some(pb) = self.bar(phase).take() {
                pb.abandon();
            }
        }
        if matches!(outcome, ScanOutcome::Cancelled) {
            let _ = self.multi.println("Scan cancelled");
        }
    }
}
