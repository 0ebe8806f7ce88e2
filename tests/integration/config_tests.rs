use clap::Parser;
use dupecleaner::actions::DeleteMode;
use dupecleaner::cli::{Cli, Commands};
use dupecleaner::config::{Config, ENV_PREFIX};
use dupecleaner::scanner::HashAlgorithm;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with(ENV_PREFIX) {
            std::env::remove_var(key);
        }
    }
}

fn scan_args(argv: &[&str]) -> dupecleaner::cli::ScanArgs {
    let Commands::Scan(args) = Cli::try_parse_from(argv).unwrap().command;
    args
}

#[test]
fn test_config_file_overrides_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
fast_hash = "blake3"
confirm_hash = "sha1"
buffer_size = 4096
trash = true
stop_at_root = false
"#,
    )
    .unwrap();

    let config = Config::try_load_from_path(&path).unwrap();
    assert_eq!(config.fast_hash, HashAlgorithm::Blake3);
    assert_eq!(config.confirm_hash, HashAlgorithm::Sha1);
    assert_eq!(config.buffer_size, 4096);
    assert_eq!(config.threads, 0);

    let options = config.delete_options(Path::new("/scan"));
    assert_eq!(options.mode, DeleteMode::Trash);
    assert!(options.boundary.is_none());
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "threads = 8\nfollow_symlinks = false\n").unwrap();
    std::env::set_var("DUPECLEANER_THREADS", "3");
    std::env::set_var("DUPECLEANER_FOLLOW_SYMLINKS", "true");

    let config = Config::try_load_from_path(&path);
    clear_env();
    let config = config.unwrap();

    assert_eq!(config.threads, 3);
    assert!(config.follow_symlinks);
}

#[test]
fn test_cli_flags_override_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "fast_hash = \"md5\"\nthreads = 8\n").unwrap();

    let mut config = Config::try_load_from_path(&path).unwrap();
    let args = scan_args(&[
        "dupecleaner",
        "scan",
        "/data",
        "--fast-hash",
        "sha1",
        "--delete",
        "--delete-empty-dirs",
        "--buffer-size",
        "8KiB",
    ]);
    config.merge_scan_args(&args);

    assert_eq!(config.fast_hash, HashAlgorithm::Sha1);
    assert_eq!(config.threads, 8);
    assert!(config.delete_empty_dirs);

    let scan = config.scan_config();
    assert_eq!(scan.fast, HashAlgorithm::Sha1);
    assert_eq!(scan.buffer_size, 8192);

    let options = config.delete_options(Path::new("/data"));
    assert!(options.delete_empty_dirs);
    assert_eq!(options.boundary.as_deref(), Some(Path::new("/data")));
}

#[test]
fn test_invalid_file_is_an_error_or_falls_back() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "fast_hash = \"crc32\"\n").unwrap();

    assert!(Config::try_load_from_path(&path).is_err());
    assert_eq!(Config::load_from_path(&path), Config::default());
}
