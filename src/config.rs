//! Configuration management and validation.
//!
//! Holds the batch-run settings (worker count, Parquet compression, progress
//! and dry-run toggles) with builder-style overrides.

use crate::error::{ProcessorError, Result};
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound on concurrently processed race days.
pub const MAX_WORKERS: usize = 100;

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }

    /// Parse the CLI spelling (`snappy`, `zstd`, `lz4`, `none`)
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "snappy" => Ok(CompressionAlgorithm::Snappy),
            "zstd" => Ok(CompressionAlgorithm::Zstd),
            "lz4" => Ok(CompressionAlgorithm::Lz4),
            "none" | "uncompressed" => Ok(CompressionAlgorithm::Uncompressed),
            other => Err(ProcessorError::configuration(format!(
                "Unknown compression algorithm '{}'. Use snappy, zstd, lz4 or none",
                other
            ))),
        }
    }
}

/// Settings for one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Race days processed concurrently
    pub max_concurrent_days: usize,

    /// Compression used for every Parquet table
    pub compression: CompressionAlgorithm,

    /// Write column statistics into Parquet files
    pub enable_statistics: bool,

    /// Show the per-day progress bar
    pub show_progress: bool,

    /// Parse and count without writing output
    pub dry_run: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_days: num_cpus::get(),
            compression: CompressionAlgorithm::Snappy,
            enable_statistics: true,
            show_progress: true,
            dry_run: false,
        }
    }
}

impl ProcessorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrent_days(mut self, workers: usize) -> Self {
        self.max_concurrent_days = workers;
        self
    }

    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_statistics(mut self, enable: bool) -> Self {
        self.enable_statistics = enable;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Check the settings are usable before a run starts
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_days == 0 {
            return Err(ProcessorError::configuration(
                "Number of workers must be greater than 0",
            ));
        }

        if self.max_concurrent_days > MAX_WORKERS {
            return Err(ProcessorError::configuration(format!(
                "Number of workers must not exceed {}",
                MAX_WORKERS
            )));
        }

        debug!("Configuration validated: {:?}", self);
        Ok(())
    }
}
