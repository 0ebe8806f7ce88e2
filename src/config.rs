//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`<config dir>/dupecleaner/config.toml`, or `--config`)
//! 3. Environment variables prefixed `DUPECLEANER_` (e.g. `DUPECLEANER_THREADS=4`)
//! 4. CLI flags, applied with [`Config::merge_scan_args`]
//!
//! ```toml
//! fast_hash = "xxh3"
//! confirm_hash = "blake3"
//! threads = 0
//! delete_empty_dirs = true
//! stop_at_root = true
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::actions::{DeleteMode, DeleteOptions};
use crate::cli::ScanArgs;
use crate::duplicates::ScanConfig;
use crate::scanner::{HashAlgorithm, DEFAULT_BUFFER_SIZE};

/// Prefix of environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "DUPECLEANER_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Algorithm for the fast scan.
    pub fast_hash: HashAlgorithm,
    /// Algorithm confirming fast-scan matches.
    pub confirm_hash: HashAlgorithm,
    /// Hashing threads (0 = available parallelism).
    pub threads: usize,
    /// Read buffer size for hashing, in bytes.
    pub buffer_size: usize,
    /// Follow symbolic links during the scan.
    pub follow_symlinks: bool,
    /// Remove directories left empty by a deletion.
    pub delete_empty_dirs: bool,
    /// Move files to the system trash instead of deleting them.
    pub trash: bool,
    /// Refuse to delete files whose size changed since the scan.
    pub verify_before_delete: bool,
    /// Never remove the scanned directory itself while tidying empty dirs.
    pub stop_at_root: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fast_hash: HashAlgorithm::Xxh3,
            confirm_hash: HashAlgorithm::Blake3,
            threads: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
            follow_symlinks: false,
            delete_empty_dirs: false,
            trash: false,
            verify_before_delete: true,
            stop_at_root: true,
        }
    }
}

impl Config {
    /// Load from the default config file and the environment.
    ///
    /// Invalid settings are logged and the defaults are used instead.
    #[must_use]
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from_path(&path),
            None => Self::try_load(None).unwrap_or_else(|e| {
                log::warn!("Invalid configuration, using defaults: {}", e);
                Self::default()
            }),
        }
    }

    /// Load from `path` and the environment, falling back to defaults.
    ///
    /// A missing file is not an error.
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        Self::try_load_from_path(path).unwrap_or_else(|e| {
            log::warn!(
                "Invalid configuration in {}, using defaults: {}",
                path.display(),
                e
            );
            Self::default()
        })
    }

    /// Load from `path` and the environment.
    ///
    /// # Errors
    ///
    /// Returns the figment error if the file or an environment variable
    /// holds a value of the wrong type.
    pub fn try_load_from_path(path: &Path) -> Result<Self, figment::Error> {
        Self::try_load(Some(path))
    }

    fn try_load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            log::debug!("Reading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX)).extract()
    }

    /// Platform-specific location of `config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dupecleaner").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply CLI overrides from the scan subcommand.
    pub fn merge_scan_args(&mut self, args: &ScanArgs) {
        if let Some(algorithm) = args.fast_hash {
            self.fast_hash = algorithm;
        }
        if let Some(algorithm) = args.confirm_hash {
            self.confirm_hash = algorithm;
        }
        if let Some(threads) = args.threads {
            self.threads = threads;
        }
        if let Some(size) = args.buffer_size {
            self.buffer_size = usize::try_from(size).unwrap_or(usize::MAX);
        }
        if args.follow_symlinks {
            self.follow_symlinks = true;
        }
        if args.delete_empty_dirs {
            self.delete_empty_dirs = true;
        }
        if args.trash {
            self.trash = true;
        }
    }

    /// Scan options derived from this configuration.
    #[must_use]
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::default()
            .with_fast_hash(self.fast_hash)
            .with_confirm_hash(self.confirm_hash)
            .with_threads(self.threads)
            .with_buffer_size(self.buffer_size)
            .with_follow_symlinks(self.follow_symlinks)
    }

    /// Deletion options for a scan of `root`.
    #[must_use]
    pub fn delete_options(&self, root: &Path) -> DeleteOptions {
        let mut options = DeleteOptions::default()
            .with_delete_empty_dirs(self.delete_empty_dirs)
            .with_mode(if self.trash {
                DeleteMode::Trash
            } else {
                DeleteMode::Permanent
            })
            .with_verify_size(self.verify_before_delete);
        if self.stop_at_root {
            options = options.with_boundary(root);
        }
        options
    }
}
