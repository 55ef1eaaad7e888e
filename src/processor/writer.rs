//! Output sinks for parsed records
//!
//! A [`RecordSink`] receives the records of each race day in day order and
//! the resolved reference entities once at the end. [`ParquetSink`] writes
//! one Parquet table per record kind; [`MemorySink`] keeps everything in
//! memory.

use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, Result};
use crate::models::{EntityRecord, EntityRef, EquipmentSnapshot, PlayerSnapshot, RaceRecord};

use chrono::NaiveDate;
use polars::df;
use polars::prelude::{DataFrame, ParquetCompression, ParquetWriter as PolarsParquetWriter};
use polars::prelude::StatisticsOptions;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const RACES_FILE: &str = "races.parquet";
pub const RACE_BOATS_FILE: &str = "race_boats.parquet";
pub const PLAYER_SNAPSHOTS_FILE: &str = "player_snapshots.parquet";
pub const MOTOR_SNAPSHOTS_FILE: &str = "motor_snapshots.parquet";
pub const BOAT_SNAPSHOTS_FILE: &str = "boat_snapshots.parquet";
pub const ENTITIES_FILE: &str = "entities.parquet";

/// Everything parsed for one race day.
#[derive(Debug, Clone, Default)]
pub struct DayBatch {
    pub date: Option<NaiveDate>,
    pub races: Vec<RaceRecord>,
    pub player_snapshots: Vec<PlayerSnapshot>,
    pub motor_snapshots: Vec<EquipmentSnapshot>,
    pub boat_snapshots: Vec<EquipmentSnapshot>,
}

impl DayBatch {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Default::default()
        }
    }

    pub fn snapshot_count(&self) -> usize {
        self.player_snapshots.len() + self.motor_snapshots.len() + self.boat_snapshots.len()
    }

    pub fn extend(&mut self, other: DayBatch) {
        self.races.extend(other.races);
        self.player_snapshots.extend(other.player_snapshots);
        self.motor_snapshots.extend(other.motor_snapshots);
        self.boat_snapshots.extend(other.boat_snapshots);
    }
}

/// Storage side of a batch run.
pub trait RecordSink {
    /// Accept one day's records. Called in day order.
    fn write_day(&mut self, batch: DayBatch) -> Result<()>;

    /// Accept the reference entities and flush.
    fn finish(&mut self, entities: Vec<EntityRecord>) -> Result<()>;
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub days: Vec<NaiveDate>,
    pub races: Vec<RaceRecord>,
    pub player_snapshots: Vec<PlayerSnapshot>,
    pub motor_snapshots: Vec<EquipmentSnapshot>,
    pub boat_snapshots: Vec<EquipmentSnapshot>,
    pub entities: Vec<EntityRecord>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for MemorySink {
    fn write_day(&mut self, batch: DayBatch) -> Result<()> {
        self.days.extend(batch.date);
        self.races.extend(batch.races);
        self.player_snapshots.extend(batch.player_snapshots);
        self.motor_snapshots.extend(batch.motor_snapshots);
        self.boat_snapshots.extend(batch.boat_snapshots);
        Ok(())
    }

    fn finish(&mut self, entities: Vec<EntityRecord>) -> Result<()> {
        self.entities = entities;
        self.finished = true;
        Ok(())
    }
}

/// Writes one Parquet file per record kind into a directory.
///
/// Records are buffered until [`RecordSink::finish`] so each table is written
/// in one pass.
#[derive(Debug)]
pub struct ParquetSink {
    output_dir: PathBuf,
    compression: ParquetCompression,
    statistics: bool,
    buffer: DayBatch,
}

impl ParquetSink {
    pub fn new(output_dir: PathBuf, config: &ProcessorConfig) -> Self {
        Self {
            output_dir,
            compression: config.compression.to_polars_compression(),
            statistics: config.enable_statistics,
            buffer: DayBatch::default(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_table(&self, name: &str, mut df: DataFrame) -> Result<usize> {
        let path = self.output_dir.join(name);
        let file = fs::File::create(&path)?;
        let statistics = if self.statistics {
            StatisticsOptions::full()
        } else {
            StatisticsOptions::empty()
        };

        PolarsParquetWriter::new(file)
            .with_compression(self.compression)
            .with_statistics(statistics)
            .finish(&mut df)
            .map_err(|e| ProcessorError::ProcessingFailed {
                path: path.clone(),
                reason: format!("Failed to write parquet: {}", e),
            })?;

        debug!("Wrote {} rows to {}", df.height(), path.display());
        Ok(df.height())
    }
}

impl RecordSink for ParquetSink {
    fn write_day(&mut self, batch: DayBatch) -> Result<()> {
        self.buffer.extend(batch);
        Ok(())
    }

    fn finish(&mut self, entities: Vec<EntityRecord>) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        let buffer = std::mem::take(&mut self.buffer);

        let races = self.write_table(RACES_FILE, races_frame(&buffer.races)?)?;
        self.write_table(RACE_BOATS_FILE, race_boats_frame(&buffer.races)?)?;
        self.write_table(
            PLAYER_SNAPSHOTS_FILE,
            player_snapshots_frame(&buffer.player_snapshots)?,
        )?;
        self.write_table(
            MOTOR_SNAPSHOTS_FILE,
            equipment_snapshots_frame(&buffer.motor_snapshots)?,
        )?;
        self.write_table(
            BOAT_SNAPSHOTS_FILE,
            equipment_snapshots_frame(&buffer.boat_snapshots)?,
        )?;
        let entity_rows = self.write_table(ENTITIES_FILE, entities_frame(&entities)?)?;

        info!(
            "Wrote {} races and {} entities to {}",
            races,
            entity_rows,
            self.output_dir.display()
        );
        Ok(())
    }
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn id(value: EntityRef) -> i64 {
    value.id.0 as i64
}

pub fn races_frame(races: &[RaceRecord]) -> Result<DataFrame> {
    let frame = df!(
        "date" => races.iter().map(|r| iso(r.date)).collect::<Vec<_>>(),
        "stadium_code" => races.iter().map(|r| r.stadium_code as i32).collect::<Vec<_>>(),
        "stadium_id" => races.iter().map(|r| id(r.stadium_ref)).collect::<Vec<_>>(),
        "race_index" => races.iter().map(|r| r.meta.race_index as i32).collect::<Vec<_>>(),
        "race_name" => races.iter().map(|r| r.meta.race_name.clone()).collect::<Vec<_>>(),
        "special_rule" => races.iter().map(|r| r.meta.special_rule.clone()).collect::<Vec<_>>(),
        "special_rule_id" => races.iter().map(|r| r.special_rule_ref.map(id)).collect::<Vec<_>>(),
        "distance_m" => races.iter().map(|r| r.meta.distance_m.map(|d| d as i32)).collect::<Vec<_>>(),
        "weather" => races.iter().map(|r| r.meta.weather.clone()).collect::<Vec<_>>(),
        "weather_id" => races.iter().map(|r| id(r.weather_ref)).collect::<Vec<_>>(),
        "wind_direction" => races.iter().map(|r| r.meta.wind_direction.clone()).collect::<Vec<_>>(),
        "wind_direction_id" => races.iter().map(|r| id(r.wind_direction_ref)).collect::<Vec<_>>(),
        "wind_speed_mps" => races.iter().map(|r| r.meta.wind_speed_mps).collect::<Vec<_>>(),
        "wave_height_cm" => races.iter().map(|r| r.meta.wave_height_cm).collect::<Vec<_>>(),
        "decisive_factor" => races.iter().map(|r| r.meta.decisive_factor.clone()).collect::<Vec<_>>(),
        "decisive_factor_id" => races.iter().map(|r| id(r.decisive_factor_ref)).collect::<Vec<_>>(),
        "refund_win" => races.iter().map(|r| r.refunds.win).collect::<Vec<_>>(),
        "refund_place_1" => races.iter().map(|r| r.refunds.place_1).collect::<Vec<_>>(),
        "refund_place_2" => races.iter().map(|r| r.refunds.place_2).collect::<Vec<_>>(),
        "refund_exacta" => races.iter().map(|r| r.refunds.exacta).collect::<Vec<_>>(),
        "refund_quinella" => races.iter().map(|r| r.refunds.quinella).collect::<Vec<_>>(),
        "refund_boxed_quinella_1" => races.iter().map(|r| r.refunds.boxed_quinella_1).collect::<Vec<_>>(),
        "refund_boxed_quinella_2" => races.iter().map(|r| r.refunds.boxed_quinella_2).collect::<Vec<_>>(),
        "refund_boxed_quinella_3" => races.iter().map(|r| r.refunds.boxed_quinella_3).collect::<Vec<_>>(),
        "refund_trifecta" => races.iter().map(|r| r.refunds.trifecta).collect::<Vec<_>>(),
        "refund_boxed_trifecta" => races.iter().map(|r| r.refunds.boxed_trifecta).collect::<Vec<_>>(),
    )?;
    Ok(frame)
}

pub fn race_boats_frame(races: &[RaceRecord]) -> Result<DataFrame> {
    let rows: Vec<_> = races
        .iter()
        .flat_map(|race| race.boats.iter().map(move |boat| (race, boat)))
        .collect();

    let frame = df!(
        "date" => rows.iter().map(|(r, _)| iso(r.date)).collect::<Vec<_>>(),
        "stadium_code" => rows.iter().map(|(r, _)| r.stadium_code as i32).collect::<Vec<_>>(),
        "race_index" => rows.iter().map(|(r, _)| r.meta.race_index as i32).collect::<Vec<_>>(),
        "boat_number" => rows.iter().map(|(_, b)| b.boat_number as i32).collect::<Vec<_>>(),
        "arrival_order" => rows.iter().map(|(_, b)| b.arrival_order.map(i32::from)).collect::<Vec<_>>(),
        "registration" => rows.iter().map(|(_, b)| b.registration as i64).collect::<Vec<_>>(),
        "player_id" => rows.iter().map(|(_, b)| id(b.player_ref)).collect::<Vec<_>>(),
        "player_name" => rows.iter().map(|(_, b)| b.player_name.clone()).collect::<Vec<_>>(),
        "motor_number" => rows.iter().map(|(_, b)| b.motor_number as i32).collect::<Vec<_>>(),
        "motor_id" => rows.iter().map(|(_, b)| id(b.motor_ref)).collect::<Vec<_>>(),
        "boat_equipment_number" => rows.iter().map(|(_, b)| b.boat_equipment_number as i32).collect::<Vec<_>>(),
        "boat_id" => rows.iter().map(|(_, b)| id(b.boat_ref)).collect::<Vec<_>>(),
        "exhibition_time" => rows.iter().map(|(_, b)| b.exhibition_time).collect::<Vec<_>>(),
        "starting_order" => rows.iter().map(|(_, b)| b.starting_order.map(i32::from)).collect::<Vec<_>>(),
        "start_timing" => rows.iter().map(|(_, b)| b.start_timing).collect::<Vec<_>>(),
        "race_time_s" => rows.iter().map(|(_, b)| b.race_time.map(|t| t.as_secs_f64())).collect::<Vec<_>>(),
    )?;
    Ok(frame)
}

pub fn player_snapshots_frame(snapshots: &[PlayerSnapshot]) -> Result<DataFrame> {
    let frame = df!(
        "date" => snapshots.iter().map(|s| iso(s.date)).collect::<Vec<_>>(),
        "stadium_id" => snapshots.iter().map(|s| id(s.stadium_ref)).collect::<Vec<_>>(),
        "registration" => snapshots.iter().map(|s| s.player_id as i64).collect::<Vec<_>>(),
        "player_id" => snapshots.iter().map(|s| id(s.player_ref)).collect::<Vec<_>>(),
        "race_index" => snapshots.iter().map(|s| s.race_index.map(i32::from)).collect::<Vec<_>>(),
        "boat_number" => snapshots.iter().map(|s| s.boat_number.map(i32::from)).collect::<Vec<_>>(),
        "age" => snapshots.iter().map(|s| s.age.map(i32::from)).collect::<Vec<_>>(),
        "weight" => snapshots.iter().map(|s| s.weight.map(i32::from)).collect::<Vec<_>>(),
        "branch_id" => snapshots.iter().map(|s| s.branch_ref.map(id)).collect::<Vec<_>>(),
        "rank_id" => snapshots.iter().map(|s| s.rank_ref.map(id)).collect::<Vec<_>>(),
        "national_win_rate" => snapshots.iter().map(|s| s.national_win_rate).collect::<Vec<_>>(),
        "national_top2_rate" => snapshots.iter().map(|s| s.national_top2_rate).collect::<Vec<_>>(),
        "local_win_rate" => snapshots.iter().map(|s| s.local_win_rate).collect::<Vec<_>>(),
        "local_top2_rate" => snapshots.iter().map(|s| s.local_top2_rate).collect::<Vec<_>>(),
    )?;
    Ok(frame)
}

pub fn equipment_snapshots_frame(snapshots: &[EquipmentSnapshot]) -> Result<DataFrame> {
    let frame = df!(
        "date" => snapshots.iter().map(|s| iso(s.date)).collect::<Vec<_>>(),
        "stadium_id" => snapshots.iter().map(|s| id(s.stadium_ref)).collect::<Vec<_>>(),
        "number" => snapshots.iter().map(|s| s.number as i32).collect::<Vec<_>>(),
        "entity_id" => snapshots.iter().map(|s| id(s.equipment_ref)).collect::<Vec<_>>(),
        "top2_rate" => snapshots.iter().map(|s| s.top2_rate).collect::<Vec<_>>(),
    )?;
    Ok(frame)
}

pub fn entities_frame(entities: &[EntityRecord]) -> Result<DataFrame> {
    let frame = df!(
        "id" => entities.iter().map(|e| e.id.0 as i64).collect::<Vec<_>>(),
        "kind" => entities.iter().map(|e| e.key.kind().to_string()).collect::<Vec<_>>(),
        "natural_key" => entities.iter().map(|e| e.key.to_string()).collect::<Vec<_>>(),
        "era" => entities.iter().map(|e| e.era as i32).collect::<Vec<_>>(),
        "label" => entities.iter().map(|e| e.label.clone()).collect::<Vec<_>>(),
        "rate" => entities.iter().map(|e| e.rate).collect::<Vec<_>>(),
    )?;
    Ok(frame)
}
