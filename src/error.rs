//! Error handling for boat-race record processing.
//!
//! Three tiers of failure are modelled separately so callers can decide how
//! far a problem propagates: [`ProcessorError`] aborts a file (or the run at
//! start-up), [`RaceRejection`] drops a single race, and [`LineDecodeError`]
//! drops the row it was raised for. Single bad fields never produce an error
//! value at all; they decode to `None`.

use crate::models::{BetType, LineRole};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Block opened by {stadium_code:02}{tag} at byte {offset} is never closed")]
    UnterminatedBlock {
        stadium_code: u8,
        tag: &'static str,
        offset: usize,
    },

    #[error("File is neither valid UTF-8 nor Shift_JIS: {path}")]
    UndecodableInput { path: PathBuf },

    #[error("File name does not encode a race date: {path}")]
    InvalidFileName { path: PathBuf },

    #[error("Input directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Entity store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Processing failed for file: {path} - {reason}")]
    ProcessingFailed { path: PathBuf, reason: String },
}

impl ProcessorError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// File-level failures are counted and skipped; everything else aborts the run.
    pub fn is_file_level(&self) -> bool {
        matches!(
            self,
            ProcessorError::Io(_)
                | ProcessorError::UnterminatedBlock { .. }
                | ProcessorError::UndecodableInput { .. }
                | ProcessorError::ProcessingFailed { .. }
        )
    }
}

/// A structurally impossible line. Voids the race (or parameter row) being built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LineDecodeError {
    #[error("{role:?} line too short: expected at least {expected} columns, found {found}")]
    TooShort {
        role: LineRole,
        expected: usize,
        found: usize,
    },

    #[error("{role:?} line is missing the '{marker}' marker")]
    MissingMarker { role: LineRole, marker: &'static str },

    #[error("Required field {field} is not usable: '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("{role:?} lines carry no fields")]
    NotDecodable { role: LineRole },
}

/// Reasons the assembler refuses to produce a race record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RaceRejection {
    #[error("expected 6 boat rows, found {found}")]
    BoatCount { found: usize },

    #[error("boat number {boat_number} appears more than once")]
    DuplicateBoat { boat_number: u8 },

    #[error("boat number {boat_number} is outside 1..=6")]
    InvalidBoatNumber { boat_number: u8 },

    #[error("race index {race_index} is outside 1..=12")]
    InvalidRaceIndex { race_index: u8 },

    #[error("race header was never seen")]
    MissingHeader,

    #[error("applicable {0:?} payout was not observed")]
    MissingRefund(BetType),

    #[error(transparent)]
    LineDecode(#[from] LineDecodeError),
}

pub type Result<T> = std::result::Result<T, ProcessorError>;
