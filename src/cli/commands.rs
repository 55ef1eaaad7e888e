//! Command implementation for the boat-race processor CLI
//!
//! Sets up logging, turns the arguments into a [`ProcessorConfig`], runs the
//! batch and reports where the output went.

use crate::cli::args::Args;
use crate::config::ProcessorConfig;
use crate::error::Result;
use crate::models::BatchStats;
use crate::processor::{BatchProcessor, MemorySink, ParquetSink};
use colored::*;
use indicatif::HumanDuration;
use std::time::Instant;
use tracing::{debug, info};

/// Main command runner
///
/// 1. Set up logging and validate arguments
/// 2. Build the configuration from defaults and CLI overrides
/// 3. Run the batch into a Parquet sink (or an in-memory one for dry runs)
/// 4. Report the outcome
pub async fn run(args: Args) -> Result<BatchStats> {
    let start_time = Instant::now();

    setup_logging(&args)?;

    info!("Starting boat-race processor");
    debug!("Command line arguments: {:?}", args);

    args.validate()?;

    let mut config = ProcessorConfig::default();
    apply_cli_overrides(&mut config, &args)?;
    config.validate()?;

    let processor = BatchProcessor::new(args.results_dir.clone(), args.parameters_dir.clone())?
        .with_config(config.clone());

    let stats = if config.dry_run {
        let mut sink = MemorySink::new();
        processor.run(&mut sink).await?
    } else {
        let mut sink = ParquetSink::new(args.output_dir.clone(), &config);
        processor.run(&mut sink).await?
    };

    if args.show_progress() {
        generate_final_report(&args, &stats, start_time);
    }
    Ok(stats)
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("boatrace_processor={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Apply command-line overrides to configuration
fn apply_cli_overrides(config: &mut ProcessorConfig, args: &Args) -> Result<()> {
    if let Some(workers) = args.workers {
        config.max_concurrent_days = workers;
    }
    config.compression = args.compression_algorithm()?;
    config.enable_statistics = !args.no_statistics;
    config.show_progress = args.show_progress();
    config.dry_run = args.dry_run;
    Ok(())
}

fn generate_final_report(args: &Args, stats: &BatchStats, start_time: Instant) {
    let duration = HumanDuration(start_time.elapsed());

    if args.dry_run {
        println!(
            "\n{} {} races checked in {}, nothing written",
            "Dry run complete:".bright_green().bold(),
            stats.races_parsed,
            duration
        );
    } else {
        println!(
            "\n{} {} in {}",
            "Output written to:".bright_green().bold(),
            args.output_dir.display().to_string().bright_white(),
            duration
        );
    }
}
