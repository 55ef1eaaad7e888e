//! Integration tests for the processor module
//!
//! Builds small dump directories on disk and runs the whole batch over them.

pub mod basic_processing;

use crate::parser::tests::{parameter_block, parameter_row, race_group, result_block, standard_race};
use std::fs;
use std::path::{Path, PathBuf};

pub const TOKUYAMA: &str = "徳　山［成績］      9/ 1";

/// Parameter dump for the six standard boats at stadium 18.
pub fn standard_parameters() -> String {
    let rows: Vec<String> = (1..=6u32)
        .map(|boat| parameter_row(boat as u8, 4000 + boat, 10 + boat, 30 + boat))
        .collect();
    parameter_block(18, "徳山", &[race_group("１", &rows)])
}

/// Result dump with `races` standard races at stadium 18.
pub fn standard_results(races: u8) -> String {
    let races: Vec<String> = (1..=races).map(standard_race).collect();
    result_block(18, TOKUYAMA, &races)
}

pub fn write_dump(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}
