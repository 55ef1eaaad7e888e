//! Boat-race Processor Library
//!
//! Converts fixed-column boat-race text dumps into validated, structured
//! records and writes them as Parquet tables.
//!
//! This library provides tools for:
//! - Segmenting dump files into per-stadium blocks
//! - Classifying and decoding fixed-column result and parameter lines
//! - Accumulating payout rows and assembling validated race records
//! - Deduplicating reference entities (stadiums, players, motors, ...) by natural key
//! - Running whole directories concurrently with per-race error isolation

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod parser;
pub mod processor;
pub mod registry;
pub mod segmenter;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

pub use config::{CompressionAlgorithm, ProcessorConfig};
pub use error::{LineDecodeError, ProcessorError, RaceRejection, Result};
pub use models::{BatchStats, EquipmentSnapshot, PlayerSnapshot, RaceRecord, SectionKind};
pub use parser::{ParameterParser, ResultParser};
pub use processor::{BatchProcessor, MemorySink, ParquetSink, RecordSink};
pub use registry::{CachingResolver, EntityResolver, EntityStore, InMemoryEntityStore};
