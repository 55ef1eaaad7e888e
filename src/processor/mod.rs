//! Batch processing of race dump directories.
//!
//! Orchestrates a whole run: file discovery, per-day parsing on blocking
//! worker threads, and handing the records to a [`RecordSink`]. Within a day
//! parameter dumps are parsed before result dumps so equipment rates are
//! known when results refer to the same motors and boats. Days run
//! concurrently but reach the sink in date order.

pub mod discovery;
pub mod input;
pub mod writer;

#[cfg(test)]
pub mod tests;

pub use self::discovery::{DayFiles, FileDiscovery};
pub use self::writer::{DayBatch, MemorySink, ParquetSink, RecordSink};

use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, Result};
use crate::models::BatchStats;
use crate::parser::{ParameterParser, ResultParser};
use crate::registry::{CachingResolver, EntityResolver, EntityStore, InMemoryEntityStore};

use chrono::NaiveDate;
use colored::*;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{debug, info, warn};

/// Main processor for race dump directories
#[derive(Debug)]
pub struct BatchProcessor<S = InMemoryEntityStore> {
    results_dir: PathBuf,
    parameters_dir: Option<PathBuf>,
    config: ProcessorConfig,
    resolver: Arc<CachingResolver<S>>,
}

impl BatchProcessor<InMemoryEntityStore> {
    /// Create a processor over a result directory and an optional separate
    /// parameter directory
    pub fn new(results_dir: PathBuf, parameters_dir: Option<PathBuf>) -> Result<Self> {
        for dir in std::iter::once(&results_dir).chain(parameters_dir.as_ref()) {
            if !dir.is_dir() {
                return Err(ProcessorError::DirectoryNotFound { path: dir.clone() });
            }
        }

        Ok(Self {
            results_dir,
            parameters_dir,
            config: ProcessorConfig::default(),
            resolver: Arc::new(CachingResolver::in_memory()),
        })
    }
}

impl<S: EntityStore + 'static> BatchProcessor<S> {
    /// Configure the processor
    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve entities against `store` instead of a fresh in-memory one
    pub fn with_store<T: EntityStore + 'static>(self, store: Arc<T>) -> BatchProcessor<T> {
        BatchProcessor {
            results_dir: self.results_dir,
            parameters_dir: self.parameters_dir,
            config: self.config,
            resolver: Arc::new(CachingResolver::new(store)),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn resolver(&self) -> &CachingResolver<S> {
        &self.resolver
    }

    /// Main processing entry point
    pub async fn run<K: RecordSink>(&self, sink: &mut K) -> Result<BatchStats> {
        self.config.validate()?;
        let start_time = Instant::now();
        let announce = self.config.show_progress;

        if announce {
            println!("{}", "Starting race dump processing".bright_green().bold());
            println!(
                "  {} {}",
                "Results:".bright_cyan(),
                self.results_dir.display()
            );
            if let Some(parameters_dir) = &self.parameters_dir {
                println!(
                    "  {} {}",
                    "Parameters:".bright_cyan(),
                    parameters_dir.display()
                );
            }
        }

        let mut discovery =
            FileDiscovery::new(self.results_dir.clone(), self.parameters_dir.clone());
        let (days, skipped) = task::spawn_blocking(move || {
            discovery
                .discover_days()
                .map(|days| (days, discovery.skipped_count()))
        })
        .await
        .map_err(|e| ProcessorError::ProcessingFailed {
            path: self.results_dir.clone(),
            reason: format!("File discovery task failed: {}", e),
        })??;

        let mut stats = BatchStats {
            files_skipped: skipped,
            ..Default::default()
        };
        info!(
            "Found {} race days ({} files)",
            days.len(),
            days.iter().map(DayFiles::file_count).sum::<usize>()
        );

        let progress = if announce {
            let pb = ProgressBar::new(days.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.set_message("Parsing race days");
            pb
        } else {
            ProgressBar::hidden()
        };

        let workers = self.config.max_concurrent_days;
        let mut outcomes = stream::iter(days)
            .map(|day| {
                let resolver = Arc::clone(&self.resolver);
                let date = day.date;
                async move {
                    task::spawn_blocking(move || process_day(&*resolver, &day))
                        .await
                        .map_err(|e| ProcessorError::ProcessingFailed {
                            path: PathBuf::from(date.to_string()),
                            reason: format!("Worker task failed: {}", e),
                        })?
                }
            })
            .buffered(workers);

        while let Some(outcome) = outcomes.next().await {
            let (batch, day_stats) = outcome?;
            stats.merge(&day_stats);
            progress.set_message(format!("{} races", stats.races_parsed));
            progress.inc(1);

            if !self.config.dry_run {
                sink.write_day(batch)?;
            }
        }
        progress.finish_with_message("All race days parsed");

        if self.config.dry_run {
            info!("Dry run: no output written");
        } else {
            sink.finish(self.resolver.store().records()?)?;
        }

        if announce {
            print_summary(&stats, start_time.elapsed().as_millis());
        }
        Ok(stats)
    }
}

/// Parse one day's dumps, parameters first
pub fn process_day(
    resolver: &dyn EntityResolver,
    day: &DayFiles,
) -> Result<(DayBatch, BatchStats)> {
    let mut batch = DayBatch::new(day.date);
    let mut stats = BatchStats::default();

    for path in &day.parameters {
        match parse_parameter_file(resolver, day.date, path) {
            Ok(output) => {
                stats.files_processed += 1;
                stats.snapshots_emitted += output.snapshot_count();
                batch.player_snapshots.extend(output.player_snapshots);
                batch.motor_snapshots.extend(output.motor_snapshots);
                batch.boat_snapshots.extend(output.boat_snapshots);
            }
            Err(error) => skip_file(path, error, &mut stats)?,
        }
    }

    for path in &day.results {
        match parse_result_file(resolver, day.date, path) {
            Ok(output) => {
                stats.files_processed += 1;
                stats.races_parsed += output.records.len();
                stats.races_rejected += output.races_rejected;
                stats.blocks_voided += output.blocks_voided;
                batch.races.extend(output.records);
            }
            Err(error) => skip_file(path, error, &mut stats)?,
        }
    }

    debug!(
        "{}: {} races, {} snapshots",
        day.date,
        batch.races.len(),
        batch.snapshot_count()
    );
    Ok((batch, stats))
}

fn parse_parameter_file(
    resolver: &dyn EntityResolver,
    date: NaiveDate,
    path: &Path,
) -> Result<crate::parser::ParameterOutput> {
    let text = input::read_dump(path)?;
    ParameterParser::new(resolver, date)?
        .with_source(path.display().to_string())
        .parse_text(&text)
}

fn parse_result_file(
    resolver: &dyn EntityResolver,
    date: NaiveDate,
    path: &Path,
) -> Result<crate::parser::ResultOutput> {
    let text = input::read_dump(path)?;
    ResultParser::new(resolver, date)
        .with_source(path.display().to_string())
        .parse_text(&text)
}

/// Count and log a file-level failure; anything else ends the run.
fn skip_file(path: &Path, error: ProcessorError, stats: &mut BatchStats) -> Result<()> {
    if !error.is_file_level() {
        return Err(error);
    }
    warn!("Skipping {}: {}", path.display(), error);
    stats.files_skipped += 1;
    Ok(())
}

fn print_summary(stats: &BatchStats, elapsed_ms: u128) {
    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        elapsed_ms.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Files processed:".bright_cyan(),
        stats.files_processed.to_string().bright_white()
    );
    if stats.files_skipped > 0 {
        println!(
            "  {} {}",
            "Files skipped:".bright_red(),
            stats.files_skipped.to_string().bright_red().bold()
        );
    }
    println!(
        "  {} {}",
        "Races parsed:".bright_cyan(),
        stats.races_parsed.to_string().bright_white().bold()
    );
    if stats.races_rejected > 0 {
        println!(
            "  {} {}",
            "Races rejected:".bright_yellow(),
            stats.races_rejected.to_string().bright_yellow()
        );
    }
    if stats.blocks_voided > 0 {
        println!(
            "  {} {}",
            "Void meets:".bright_yellow(),
            stats.blocks_voided.to_string().bright_yellow()
        );
    }
    println!(
        "  {} {}",
        "Snapshots:".bright_cyan(),
        stats.snapshots_emitted.to_string().bright_white()
    );
}
