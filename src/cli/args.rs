//! Command-line argument definitions for the boat-race processor
//!
//! This module defines the CLI interface using the clap derive API.

use crate::config::{CompressionAlgorithm, MAX_WORKERS};
use crate::error::{ProcessorError, Result};
use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the boat-race record processor
///
/// Parses daily race result dumps (`kYYMMDD.txt`) and player/equipment
/// parameter dumps (`bYYMMDD.txt`) into Parquet tables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "boatrace-processor",
    version,
    about = "Convert boat-race result and parameter dumps to Parquet",
    long_about = "Parses fixed-column boat-race text dumps into race records, player and \
                  equipment snapshots, and deduplicated reference entities, then writes them \
                  as Parquet tables. Malformed races are logged and skipped without stopping \
                  the run."
)]
pub struct Args {
    /// Directory holding result dumps
    ///
    /// Searched recursively. Parameter dumps found here are picked up too.
    #[arg(value_name = "RESULTS_DIR")]
    pub results_dir: PathBuf,

    /// Separate directory holding parameter dumps
    #[arg(
        short = 'p',
        long = "parameters",
        value_name = "PATH",
        help = "Directory holding parameter dumps, if not alongside the results"
    )]
    pub parameters_dir: Option<PathBuf>,

    /// Output directory for generated Parquet files
    ///
    /// Will be created if it doesn't exist.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        default_value = "parquet",
        help = "Output directory for Parquet files"
    )]
    pub output_dir: PathBuf,

    /// Number of race days processed concurrently
    #[arg(
        short = 'j',
        long = "workers",
        value_name = "COUNT",
        help = "Number of race days processed concurrently (default: CPU count)"
    )]
    pub workers: Option<usize>,

    /// Parquet compression algorithm
    #[arg(
        long = "compression",
        value_name = "ALGORITHM",
        default_value = "snappy",
        help = "Parquet compression algorithm (snappy, zstd, lz4, none)"
    )]
    pub compression: String,

    /// Leave column statistics out of the Parquet files
    #[arg(long = "no-statistics", help = "Do not write Parquet column statistics")]
    pub no_statistics: bool,

    /// Parse everything but write nothing
    #[arg(
        long = "dry-run",
        help = "Parse and report counts without creating output files"
    )]
    pub dry_run: bool,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show errors. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Args {
    /// Validate the arguments for consistency
    pub fn validate(&self) -> Result<()> {
        for dir in std::iter::once(&self.results_dir).chain(self.parameters_dir.as_ref()) {
            if !dir.is_dir() {
                return Err(ProcessorError::DirectoryNotFound { path: dir.clone() });
            }
        }

        if let Some(workers) = self.workers {
            if workers == 0 || workers > MAX_WORKERS {
                return Err(ProcessorError::configuration(format!(
                    "Number of workers must be between 1 and {}",
                    MAX_WORKERS
                )));
            }
        }

        self.compression_algorithm()?;

        if self.output_dir.is_file() {
            return Err(ProcessorError::configuration(format!(
                "Output path is a file: {}",
                self.output_dir.display()
            )));
        }

        Ok(())
    }

    pub fn compression_algorithm(&self) -> Result<CompressionAlgorithm> {
        CompressionAlgorithm::parse(&self.compression)
    }

    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(extra: &[&str], results_dir: &str) -> Args {
        let mut argv = vec!["boatrace-processor", results_dir];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[], "dumps");
        assert_eq!(args.results_dir, PathBuf::from("dumps"));
        assert_eq!(args.output_dir, PathBuf::from("parquet"));
        assert_eq!(args.compression, "snappy");
        assert_eq!(args.workers, None);
        assert!(!args.dry_run);
        assert_eq!(args.get_log_level(), "warn");
        assert!(args.show_progress());
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(parse(&["-v"], "dumps").get_log_level(), "info");
        assert_eq!(parse(&["-vv"], "dumps").get_log_level(), "debug");
        assert_eq!(parse(&["-vvvv"], "dumps").get_log_level(), "trace");

        let quiet = parse(&["--quiet"], "dumps");
        assert_eq!(quiet.get_log_level(), "error");
        assert!(!quiet.show_progress());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["boatrace-processor", "dumps", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_results_dir_is_required() {
        assert!(Args::try_parse_from(["boatrace-processor"]).is_err());
    }

    #[test]
    fn test_validate() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_str().unwrap();

        assert!(parse(&["-j", "4", "--compression", "zstd"], dir).validate().is_ok());
        assert!(parse(&["-j", "0"], dir).validate().is_err());
        assert!(parse(&["--compression", "brotli"], dir).validate().is_err());

        let missing = temp_dir.path().join("missing");
        match parse(&["-p", missing.to_str().unwrap()], dir)
            .validate()
            .unwrap_err()
        {
            ProcessorError::DirectoryNotFound { path } => assert_eq!(path, missing),
            _ => panic!("Expected DirectoryNotFound error"),
        }
    }
}
