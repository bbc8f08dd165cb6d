//! Configuration: CLI surface and the `Config` it resolves into.

use crate::error::SyncError;
use clap::Parser;
use std::path::PathBuf;

/// dirsync - mirror a destination directory to match a source directory
#[derive(Parser, Debug)]
#[command(name = "dirsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Source directory
    pub source: PathBuf,

    /// Destination directory
    pub destination: PathBuf,

    /// Only sync files whose final path segment matches this glob
    #[arg(long, default_value = "")]
    pub pattern: String,

    /// Number of copy workers (default: number of CPU cores, clamped 2-32)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Let the worker pool grow/shrink based on observed read/write timing
    #[arg(long)]
    pub adaptive: bool,

    /// Remove destination files that no longer exist in source
    #[arg(long)]
    pub delete: bool,

    /// Skip the confirmation prompt before syncing
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Enable debug-level logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Mirror logs to this file in addition to stderr
    #[arg(long)]
    pub log: Option<PathBuf>,
}

/// Resolved, validated configuration used to build an `Engine`.
#[derive(Debug, Clone)]
pub struct Config {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub pattern: String,
    pub workers: Option<usize>,
    pub adaptive: bool,
    pub delete_enabled: bool,
    pub skip_confirmation: bool,
    pub verbose: bool,
    pub log_path: Option<PathBuf>,
}

impl Config {
    /// Checks source existence/type, source != destination, and pattern
    /// syntax before the engine is constructed.
    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.source.exists() {
            return Err(SyncError::SourceNotFound(self.source.clone()));
        }
        if !self.source.is_dir() {
            return Err(SyncError::SourceNotDirectory(self.source.clone()));
        }
        if self.source == self.destination {
            return Err(SyncError::SameSourceAndDest(self.source.clone()));
        }
        if !self.pattern.is_empty() {
            glob::Pattern::new(&self.pattern).map_err(|source| SyncError::InvalidPattern {
                pattern: self.pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

impl TryFrom<Cli> for Config {
    type Error = SyncError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let config = Config {
            source: cli.source,
            destination: cli.destination,
            pattern: cli.pattern,
            workers: cli.workers,
            adaptive: cli.adaptive,
            delete_enabled: cli.delete,
            skip_confirmation: cli.yes,
            verbose: cli.verbose,
            log_path: Some(cli.log.unwrap_or_else(default_log_path)),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Falls back to a process-unique file under the system temp directory when
/// the caller doesn't pass `--log`.
fn default_log_path() -> PathBuf {
    std::env::temp_dir().join(format!("dirsync-{}.log", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn temp_dir() -> TempDir {
        tempfile::tempdir().expect("failed to create temp dir")
    }

    fn base_cli(source: PathBuf, destination: PathBuf) -> Cli {
        Cli {
            source,
            destination,
            pattern: String::new(),
            workers: None,
            adaptive: false,
            delete: false,
            yes: false,
            verbose: false,
            log: None,
        }
    }

    #[test]
    fn validation_fails_when_source_equals_dest() {
        let dir = temp_dir();
        let path = dir.path().to_path_buf();
        let config = Config {
            source: path.clone(),
            destination: path,
            pattern: String::new(),
            workers: None,
            adaptive: false,
            delete_enabled: false,
            skip_confirmation: false,
            verbose: false,
            log_path: None,
        };
        assert!(matches!(config.validate(), Err(SyncError::SameSourceAndDest(_))));
    }

    #[test]
    fn validation_fails_when_source_missing() {
        let config = Config {
            source: PathBuf::from("/nonexistent/path/for/real"),
            destination: PathBuf::from("/some/other/path"),
            pattern: String::new(),
            workers: None,
            adaptive: false,
            delete_enabled: false,
            skip_confirmation: false,
            verbose: false,
            log_path: None,
        };
        assert!(matches!(config.validate(), Err(SyncError::SourceNotFound(_))));
    }

    #[test]
    fn validation_fails_with_invalid_pattern() {
        let src = temp_dir();
        let dst = temp_dir();
        let config = Config {
            source: src.path().to_path_buf(),
            destination: dst.path().to_path_buf(),
            pattern: "[unterminated".into(),
            workers: None,
            adaptive: false,
            delete_enabled: false,
            skip_confirmation: false,
            verbose: false,
            log_path: None,
        };
        assert!(matches!(config.validate(), Err(SyncError::InvalidPattern { .. })));
    }

    #[test]
    fn cli_conversion_maps_delete_flag() {
        let src = temp_dir();
        let dst = temp_dir();
        let mut cli = base_cli(src.path().to_path_buf(), dst.path().to_path_buf());
        cli.delete = true;

        let config = Config::try_from(cli).unwrap();
        assert!(config.delete_enabled);
    }

    #[test]
    fn cli_conversion_defaults_log_path_to_a_temp_file_when_unset() {
        let src = temp_dir();
        let dst = temp_dir();
        let cli = base_cli(src.path().to_path_buf(), dst.path().to_path_buf());

        let config = Config::try_from(cli).unwrap();
        assert!(config.log_path.is_some());
        assert!(config.log_path.unwrap().starts_with(std::env::temp_dir()));
    }

    #[test]
    fn cli_conversion_keeps_explicit_log_path() {
        let src = temp_dir();
        let dst = temp_dir();
        let mut cli = base_cli(src.path().to_path_buf(), dst.path().to_path_buf());
        cli.log = Some(PathBuf::from("/var/log/dirsync.log"));

        let config = Config::try_from(cli).unwrap();
        assert_eq!(config.log_path, Some(PathBuf::from("/var/log/dirsync.log")));
    }

    #[test]
    fn cli_conversion_validates_before_returning() {
        let cli = base_cli(
            PathBuf::from("/nonexistent/path/for/real"),
            PathBuf::from("/some/other/path"),
        );
        assert!(Config::try_from(cli).is_err());
    }

    #[test]
    fn source_as_file_not_directory_is_rejected() {
        let dir = temp_dir();
        let file = dir.path().join("afile");
        fs::write(&file, b"x").unwrap();
        let dst = temp_dir();

        let config = Config {
            source: file,
            destination: dst.path().to_path_buf(),
            pattern: String::new(),
            workers: None,
            adaptive: false,
            delete_enabled: false,
            skip_confirmation: false,
            verbose: false,
            log_path: None,
        };
        assert!(matches!(config.validate(), Err(SyncError::SourceNotDirectory(_))));
    }
}
