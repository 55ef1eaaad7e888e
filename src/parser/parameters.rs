//! Parameter dump parsing.
//!
//! Parameter blocks list six boat rows per race group back to back, so a
//! line only needs sorting into one of a handful of shapes before the row
//! decoder takes over.

use crate::constants::parameter_columns::ROW_MIN_WIDTH;
use crate::constants::{
    venue_name, FULL_WIDTH_SPACE, PARAMETER_HEADER_PREFIXES, PARAMETER_SEPARATOR_PREFIX,
    PARAMETER_STADIUM_PREFIX,
};
use crate::error::Result;
use crate::models::{
    EntityKind, EntityRef, EquipmentSnapshot, PlayerSnapshot, RawBlock, SectionKind,
};
use crate::registry::EntityResolver;
use crate::segmenter::segment_all;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::fields::{decode_parameter_row, normalize_digits, parse_int, ParameterRowFields};

/// Shape of one line inside a parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLine {
    StadiumName,
    RaceGroup(Option<u8>),
    Header,
    Separator,
    BoatRow,
    Other,
}

/// Snapshots extracted from one parameter file.
#[derive(Debug, Default)]
pub struct ParameterOutput {
    pub player_snapshots: Vec<PlayerSnapshot>,
    pub motor_snapshots: Vec<EquipmentSnapshot>,
    pub boat_snapshots: Vec<EquipmentSnapshot>,
    pub rows_rejected: usize,
}

impl ParameterOutput {
    pub fn snapshot_count(&self) -> usize {
        self.player_snapshots.len() + self.motor_snapshots.len() + self.boat_snapshots.len()
    }
}

pub struct ParameterParser<'r> {
    resolver: &'r dyn EntityResolver,
    date: NaiveDate,
    source: String,
    race_group: Regex,
}

impl<'r> ParameterParser<'r> {
    pub fn new(resolver: &'r dyn EntityResolver, date: NaiveDate) -> Result<Self> {
        Ok(Self {
            resolver,
            date,
            source: String::from("<memory>"),
            race_group: Regex::new(r"^[\s　]*([０-９0-9]{1,2})[ＲR]")?,
        })
    }

    /// Name used for the file in log messages.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Sort a parameter line into its shape.
    pub fn classify_line(&self, line: &str) -> ParameterLine {
        let trimmed = line.trim_end();
        if trimmed.trim_start().is_empty() {
            return ParameterLine::Other;
        }
        if trimmed.starts_with(PARAMETER_STADIUM_PREFIX) {
            return ParameterLine::StadiumName;
        }
        if trimmed.starts_with(PARAMETER_SEPARATOR_PREFIX) {
            return ParameterLine::Separator;
        }
        if PARAMETER_HEADER_PREFIXES
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
        {
            return ParameterLine::Header;
        }
        if let Some(captures) = self.race_group.captures(trimmed) {
            let index = captures
                .get(1)
                .and_then(|digits| parse_int(&normalize_digits(digits.as_str())));
            return ParameterLine::RaceGroup(index);
        }
        if looks_like_parameter_row(trimmed) {
            return ParameterLine::BoatRow;
        }
        ParameterLine::Other
    }

    /// Parse every parameter block of a decoded file.
    pub fn parse_text(&self, text: &str) -> Result<ParameterOutput> {
        let blocks = segment_all(text, SectionKind::Parameter)?;
        let mut output = ParameterOutput::default();
        let mut seen_players = HashSet::new();
        let mut seen_equipment = HashSet::new();

        for block in &blocks {
            self.parse_block(block, &mut output, &mut seen_players, &mut seen_equipment)?;
        }

        debug!(
            "{}: {} parameter blocks, {} snapshots, {} rows rejected",
            self.source,
            blocks.len(),
            output.snapshot_count(),
            output.rows_rejected
        );
        Ok(output)
    }

    fn parse_block(
        &self,
        block: &RawBlock<'_>,
        output: &mut ParameterOutput,
        seen_players: &mut HashSet<(EntityRef, EntityRef)>,
        seen_equipment: &mut HashSet<(EntityRef, EntityRef)>,
    ) -> Result<()> {
        let stadium_ref = self.resolve_stadium(block)?;
        let mut race_index = None;

        for (line_index, line) in block.text.lines().enumerate() {
            match self.classify_line(line) {
                ParameterLine::RaceGroup(index) => race_index = index,
                ParameterLine::BoatRow => match decode_parameter_row(line) {
                    Ok(row) => {
                        let (player, motor, boat) =
                            self.snapshots(row, block.stadium_code, stadium_ref, race_index)?;
                        if seen_players.insert((player.player_ref, stadium_ref)) {
                            output.player_snapshots.push(player);
                        }
                        if let Some(motor) = motor {
                            if seen_equipment.insert((motor.equipment_ref, stadium_ref)) {
                                output.motor_snapshots.push(motor);
                            }
                        }
                        if let Some(boat) = boat {
                            if seen_equipment.insert((boat.equipment_ref, stadium_ref)) {
                                output.boat_snapshots.push(boat);
                            }
                        }
                    }
                    Err(error) => {
                        warn!(
                            "{}: stadium {:02} parameter line {} dropped: {}",
                            self.source, block.stadium_code, line_index, error
                        );
                        output.rows_rejected += 1;
                    }
                },
                ParameterLine::StadiumName
                | ParameterLine::Header
                | ParameterLine::Separator
                | ParameterLine::Other => {}
            }
        }
        Ok(())
    }

    fn snapshots(
        &self,
        row: ParameterRowFields,
        stadium_code: u8,
        stadium_ref: EntityRef,
        race_index: Option<u8>,
    ) -> Result<(PlayerSnapshot, Option<EquipmentSnapshot>, Option<EquipmentSnapshot>)> {
        let resolver = self.resolver;

        let player_ref = resolver.resolve_player(row.registration, &row.player_name)?;
        let branch_ref = row
            .branch
            .as_deref()
            .map(|branch| resolver.resolve_named(EntityKind::Branch, branch))
            .transpose()?;
        let rank_ref = row
            .rank
            .as_deref()
            .map(|rank| resolver.resolve_named(EntityKind::Rank, rank))
            .transpose()?;

        let motor = match row.motor_number {
            Some(number) => Some(EquipmentSnapshot {
                number,
                equipment_ref: resolver.resolve_equipment(
                    EntityKind::Motor,
                    number,
                    stadium_code,
                    row.motor_top2_rate,
                )?,
                stadium_ref,
                date: self.date,
                top2_rate: row.motor_top2_rate,
            }),
            None => None,
        };
        let boat = match row.boat_equipment_number {
            Some(number) => Some(EquipmentSnapshot {
                number,
                equipment_ref: resolver.resolve_equipment(
                    EntityKind::Boat,
                    number,
                    stadium_code,
                    row.boat_top2_rate,
                )?,
                stadium_ref,
                date: self.date,
                top2_rate: row.boat_top2_rate,
            }),
            None => None,
        };

        let player = PlayerSnapshot {
            player_id: row.registration,
            player_ref,
            stadium_ref,
            date: self.date,
            race_index,
            boat_number: Some(row.boat_number),
            age: row.age,
            weight: row.weight,
            branch_ref,
            rank_ref,
            national_win_rate: row.national_win_rate,
            national_top2_rate: row.national_top2_rate,
            local_win_rate: row.local_win_rate,
            local_top2_rate: row.local_top2_rate,
        };
        Ok((player, motor, boat))
    }

    fn resolve_stadium(&self, block: &RawBlock<'_>) -> Result<EntityRef> {
        let printed = block
            .text
            .lines()
            .find(|line| self.classify_line(line) == ParameterLine::StadiumName)
            .map(|line| {
                line.trim_start_matches(PARAMETER_STADIUM_PREFIX)
                    .split(' ')
                    .next()
                    .unwrap_or_default()
                    .replace(FULL_WIDTH_SPACE, "")
            })
            .filter(|name| !name.is_empty());

        let name = match (venue_name(block.stadium_code), printed) {
            (Some(official), Some(printed)) => {
                if printed != official {
                    warn!(
                        "{}: stadium {:02} printed as '{}', expected '{}'",
                        self.source, block.stadium_code, printed, official
                    );
                }
                official.to_string()
            }
            (Some(official), None) => official.to_string(),
            (None, printed) => {
                warn!(
                    "{}: unknown stadium code {:02}",
                    self.source, block.stadium_code
                );
                printed.unwrap_or_default()
            }
        };

        self.resolver.resolve_stadium(block.stadium_code, &name)
    }
}

/// A boat row opens with a boat number 1-6 followed by a space.
fn looks_like_parameter_row(line: &str) -> bool {
    let mut chars = line.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('1'..='6'), Some(' '))
    ) && line.chars().count() >= ROW_MIN_WIDTH
}
