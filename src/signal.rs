//! Cancellation tokens and Ctrl+C handling.
//!
//! A [`CancellationToken`] wraps an `AtomicBool` shared across threads. The
//! scan pipeline checks it before starting each per-file task; tasks that
//! are already reading a file run to completion.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dupecleaner::signal::install_handler;
//!
//! // Ctrl+C now cancels this token
//! let token = install_handler().expect("Failed to install signal handler");
//!
//! if token.is_cancelled() {
//!     println!("Cancelled, discarding partial results");
//! }
//! ```
//!
//! # Exit Codes
//!
//! When a signal is received:
//! - The token is cancelled
//! - A message "Cancelling..." is printed to stderr
//! - The application should exit with code 130 (128 + SIGINT)

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (Ctrl+C) interruption.
/// This follows Unix convention: 128 + signal number (SIGINT = 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Cooperative cancellation handle.
///
/// Clones share the same flag, so a token handed to the pipeline can be
/// cancelled from any other clone.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can drive another scan.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Request cancellation of whatever `token` is driving.
pub fn request_cancel(token: &CancellationToken) {
    log::debug!("Cancellation requested");
    token.cancel();
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_TOKEN: OnceLock<CancellationToken> = OnceLock::new();

/// Install a Ctrl+C handler that cancels the returned token.
///
/// The process-wide handler can only be registered once. Later calls (for
/// example from parallel tests that each run the application) reset and
/// return the already-registered token.
///
/// # Errors
///
/// Returns `InstallFailed` if no handler could be registered and none was
/// registered by an earlier call.
pub fn install_handler() -> Result<CancellationToken, SignalError> {
    if let Some(token) = GLOBAL_TOKEN.get() {
        token.reset();
        return Ok(token.clone());
    }

    let token = CancellationToken::new();
    let hooked = token.clone();

    match ctrlc::set_handler(move || {
        hooked.cancel();

        let _ = writeln!(std::io::stderr(), "\nCancelling...");
        let _ = std::io::stderr().flush();

        log::info!("Cancellation signal received");
    }) {
        Ok(()) => {
            let _ = GLOBAL_TOKEN.set(token.clone());
            Ok(token)
        }
        Err(e) => match GLOBAL_TOKEN.get() {
            Some(existing) => {
                existing.reset();
                Ok(existing.clone())
            }
            None => Err(SignalError::InstallFailed(e)),
        },
    }
}
