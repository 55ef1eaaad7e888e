//! Basic processing integration tests

use super::{standard_parameters, standard_results, write_dump};
use crate::config::ProcessorConfig;
use crate::models::EntityKind;
use crate::processor::writer::{
    BOAT_SNAPSHOTS_FILE, ENTITIES_FILE, MOTOR_SNAPSHOTS_FILE, PLAYER_SNAPSHOTS_FILE,
    RACE_BOATS_FILE, RACES_FILE,
};
use crate::processor::{BatchProcessor, MemorySink, ParquetSink};
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn quiet_config() -> ProcessorConfig {
    ProcessorConfig::new()
        .with_progress(false)
        .with_max_concurrent_days(2)
}

#[tokio::test]
async fn test_day_with_parameters_and_results() {
    let temp_dir = TempDir::new().unwrap();
    let dumps = temp_dir.path().join("dumps");
    write_dump(&dumps, "b230901.txt", &standard_parameters());
    write_dump(&dumps, "k230901.txt", &standard_results(2));

    let processor = BatchProcessor::new(dumps, None)
        .unwrap()
        .with_config(quiet_config());
    let mut sink = MemorySink::new();
    let stats = processor.run(&mut sink).await.unwrap();

    assert_eq!(stats.files_processed, 2);
    assert_eq!(stats.files_skipped, 0);
    assert_eq!(stats.races_parsed, 2);
    assert_eq!(stats.races_rejected, 0);
    assert_eq!(stats.snapshots_emitted, 18);

    assert!(sink.finished);
    assert_eq!(sink.days, vec![NaiveDate::from_ymd_opt(2023, 9, 1).unwrap()]);
    assert_eq!(sink.races.len(), 2);
    assert_eq!(sink.player_snapshots.len(), 6);

    // Results refer to the motors and boats the parameter dump introduced.
    let motor = sink
        .motor_snapshots
        .iter()
        .find(|snapshot| snapshot.number == 11)
        .unwrap();
    assert_eq!(sink.races[0].boats[0].motor_ref, motor.equipment_ref);
    let player = &sink.player_snapshots[0];
    assert_eq!(sink.races[0].boats[0].player_ref, player.player_ref);

    let count = |kind: EntityKind| sink.entities.iter().filter(|e| e.key.kind() == kind).count();
    assert_eq!(count(EntityKind::Stadium), 1);
    assert_eq!(count(EntityKind::Player), 6);
    assert_eq!(count(EntityKind::Motor), 6);
    assert_eq!(count(EntityKind::Boat), 6);
}

#[tokio::test]
async fn test_separate_parameter_directory() {
    let temp_dir = TempDir::new().unwrap();
    let results = temp_dir.path().join("results");
    let parameters = temp_dir.path().join("parameters");
    write_dump(&results, "k230901.txt", &standard_results(1));
    write_dump(&parameters, "b230901.txt", &standard_parameters());

    let processor = BatchProcessor::new(results, Some(parameters))
        .unwrap()
        .with_config(quiet_config());
    let mut sink = MemorySink::new();
    let stats = processor.run(&mut sink).await.unwrap();

    assert_eq!(stats.files_processed, 2);
    assert_eq!(sink.races.len(), 1);
    assert_eq!(sink.boat_snapshots.len(), 6);
}

#[tokio::test]
async fn test_days_reach_sink_in_date_order() {
    let temp_dir = TempDir::new().unwrap();
    let dumps = temp_dir.path().join("dumps");
    for name in ["k230903.txt", "k230901.txt", "k230902.txt"] {
        write_dump(&dumps, name, &standard_results(1));
    }

    let processor = BatchProcessor::new(dumps, None)
        .unwrap()
        .with_config(quiet_config().with_max_concurrent_days(3));
    let mut sink = MemorySink::new();
    let stats = processor.run(&mut sink).await.unwrap();

    assert_eq!(stats.races_parsed, 3);
    let days: Vec<u32> = sink.days.iter().map(|day| chrono::Datelike::day(day)).collect();
    assert_eq!(days, vec![1, 2, 3]);

    // Concurrent days share one identity per player.
    let players: Vec<_> = sink.races.iter().map(|race| race.boats[0].player_ref).collect();
    assert!(players.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(
        sink.entities
            .iter()
            .filter(|e| e.key.kind() == EntityKind::Player)
            .count(),
        6
    );
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let dumps = temp_dir.path().join("dumps");
    write_dump(&dumps, "k230901.txt", &standard_results(1));
    let output_dir = temp_dir.path().join("parquet");

    let config = quiet_config().with_dry_run(true);
    let processor = BatchProcessor::new(dumps, None)
        .unwrap()
        .with_config(config.clone());
    let mut sink = ParquetSink::new(output_dir.clone(), &config);
    let stats = processor.run(&mut sink).await.unwrap();

    assert_eq!(stats.races_parsed, 1);
    assert!(!output_dir.exists());
}

#[tokio::test]
async fn test_parquet_output_tables() {
    let temp_dir = TempDir::new().unwrap();
    let dumps = temp_dir.path().join("dumps");
    write_dump(&dumps, "b230901.txt", &standard_parameters());
    write_dump(&dumps, "k230901.txt", &standard_results(3));
    let output_dir = temp_dir.path().join("parquet");

    let config = quiet_config();
    let processor = BatchProcessor::new(dumps, None)
        .unwrap()
        .with_config(config.clone());
    let mut sink = ParquetSink::new(output_dir.clone(), &config);
    processor.run(&mut sink).await.unwrap();

    for name in [
        RACES_FILE,
        RACE_BOATS_FILE,
        PLAYER_SNAPSHOTS_FILE,
        MOTOR_SNAPSHOTS_FILE,
        BOAT_SNAPSHOTS_FILE,
        ENTITIES_FILE,
    ] {
        let metadata = fs::metadata(output_dir.join(name)).unwrap();
        assert!(metadata.len() > 0, "{} is empty", name);
    }

    let file = fs::File::open(output_dir.join(RACE_BOATS_FILE)).unwrap();
    let boats = ParquetReader::new(file).finish().unwrap();
    assert_eq!(boats.height(), 18);
}

#[tokio::test]
async fn test_shared_store_across_processors() {
    let temp_dir = TempDir::new().unwrap();
    let first = temp_dir.path().join("first");
    let second = temp_dir.path().join("second");
    write_dump(&first, "k230901.txt", &standard_results(1));
    write_dump(&second, "k230902.txt", &standard_results(1));

    let store = Arc::new(crate::registry::InMemoryEntityStore::new());
    let mut first_sink = MemorySink::new();
    BatchProcessor::new(first, None)
        .unwrap()
        .with_config(quiet_config())
        .with_store(Arc::clone(&store))
        .run(&mut first_sink)
        .await
        .unwrap();
    let mut second_sink = MemorySink::new();
    BatchProcessor::new(second, None)
        .unwrap()
        .with_config(quiet_config())
        .with_store(Arc::clone(&store))
        .run(&mut second_sink)
        .await
        .unwrap();

    assert_eq!(
        first_sink.races[0].stadium_ref,
        second_sink.races[0].stadium_ref
    );
    assert_eq!(first_sink.entities.len(), second_sink.entities.len());
}
