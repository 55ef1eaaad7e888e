//! Result dump parsing.
//!
//! Drives one decoded result file through segmentation, classification,
//! field decoding, entity resolution and assembly. Problems are contained at
//! the narrowest level that makes sense: a bad field becomes `None`, a bad
//! line voids its race, a void marker voids its block, and an unterminated
//! block rejects the whole file.

use crate::constants::{venue_name, FULL_WIDTH_SPACE};
use crate::error::{RaceRejection, Result};
use crate::models::{
    BoatResult, ClassifiedLine, EntityKind, EntityRef, LineRole, RaceMeta, RaceRecord, RawBlock,
    SectionKind,
};
use crate::registry::EntityResolver;
use crate::segmenter::segment_all;
use chrono::NaiveDate;
use tracing::{debug, warn};

use super::assembler::{ConditionRefs, RaceContext, RaceRecordBuilder};
use super::classifier::{classify_block, BlockOutcome};
use super::fields::{decode, decode_race_index, BoatRowFields, PartialRecord, RaceHeaderFields};

/// A decoded race header, or why it could not be used together with
/// whatever race index was still readable.
type PendingHeader = std::result::Result<RaceHeaderFields, (Option<u8>, RaceRejection)>;

/// Everything extracted from one result file.
#[derive(Debug, Default)]
pub struct ResultOutput {
    /// Valid races in file order.
    pub records: Vec<RaceRecord>,
    pub races_rejected: usize,
    /// Payout lines with no category left to fill.
    pub refund_lines_dropped: usize,
    pub blocks_voided: usize,
    pub blocks: usize,
}

/// A race between its table header and its terminator.
enum RaceSlot {
    Idle,
    Building(Box<RaceRecordBuilder>),
    Voided {
        race_index: Option<u8>,
        reason: RaceRejection,
    },
}

pub struct ResultParser<'r> {
    resolver: &'r dyn EntityResolver,
    date: NaiveDate,
    source: String,
}

impl<'r> ResultParser<'r> {
    pub fn new(resolver: &'r dyn EntityResolver, date: NaiveDate) -> Self {
        Self {
            resolver,
            date,
            source: String::from("<memory>"),
        }
    }

    /// Name used for the file in log messages.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Parse every result block of a decoded file.
    pub fn parse_text(&self, text: &str) -> Result<ResultOutput> {
        let blocks = segment_all(text, SectionKind::Result)?;
        let mut output = ResultOutput::default();

        for block in &blocks {
            self.parse_block(block, &mut output)?;
        }

        debug!(
            "{}: {} blocks, {} races, {} rejected, {} voided blocks",
            self.source,
            output.blocks,
            output.records.len(),
            output.races_rejected,
            output.blocks_voided
        );
        Ok(output)
    }

    /// Parse one result block, appending to `output`.
    pub fn parse_block(&self, block: &RawBlock<'_>, output: &mut ResultOutput) -> Result<()> {
        output.blocks += 1;

        let lines = match classify_block(block) {
            BlockOutcome::Void => {
                warn!(
                    "{}: stadium {:02} block is void, no races recorded",
                    self.source, block.stadium_code
                );
                output.blocks_voided += 1;
                return Ok(());
            }
            BlockOutcome::Lines(lines) => lines,
        };

        let stadium_ref = self.resolve_stadium(block, &lines)?;
        let context = RaceContext {
            stadium_code: block.stadium_code,
            stadium_ref,
            date: self.date,
        };

        let mut pending_header: Option<PendingHeader> = None;
        let mut slot = RaceSlot::Idle;

        for line in &lines {
            match line.role {
                LineRole::RaceHeader => {
                    pending_header = Some(
                        match decode(LineRole::RaceHeader, line.raw_text) {
                            Ok(PartialRecord::RaceHeader(fields)) => Ok(fields),
                            Ok(_) => Err((None, RaceRejection::MissingHeader)),
                            Err(error) => Err((decode_race_index(line.raw_text), error.into())),
                        },
                    );
                }
                LineRole::DecisiveFactor => {
                    slot = self.open_race(context, pending_header.take(), line)?;
                }
                LineRole::BoatResult => {
                    if let RaceSlot::Building(builder) = &mut slot {
                        match decode(LineRole::BoatResult, line.raw_text) {
                            Ok(PartialRecord::BoatRow(fields)) => {
                                let boat = self.resolve_boat(block.stadium_code, fields)?;
                                builder.push_boat(boat);
                            }
                            Ok(_) => {}
                            Err(error) => {
                                slot = RaceSlot::Voided {
                                    race_index: Some(builder.race_index()),
                                    reason: error.into(),
                                };
                            }
                        }
                    }
                }
                LineRole::Refund => {
                    if let RaceSlot::Building(builder) = &mut slot {
                        match decode(LineRole::Refund, line.raw_text) {
                            Ok(PartialRecord::Refund(refund)) => {
                                if !builder.push_refund(&refund) {
                                    warn!(
                                        "{}: stadium {:02} race {}R payout line dropped: '{}'",
                                        self.source,
                                        block.stadium_code,
                                        builder.race_index(),
                                        line.raw_text.trim()
                                    );
                                    output.refund_lines_dropped += 1;
                                }
                            }
                            Ok(_) => {}
                            Err(error) => {
                                slot = RaceSlot::Voided {
                                    race_index: Some(builder.race_index()),
                                    reason: error.into(),
                                };
                            }
                        }
                    }
                }
                LineRole::Terminator => {
                    let finished = std::mem::replace(&mut slot, RaceSlot::Idle);
                    self.close_race(block.stadium_code, finished, output);
                }
                LineRole::StadiumName
                | LineRole::RaceSeparator
                | LineRole::Blank
                | LineRole::Unclassified
                | LineRole::ParameterRow => {}
            }
        }

        let leftover = std::mem::replace(&mut slot, RaceSlot::Idle);
        self.close_race(block.stadium_code, leftover, output);
        Ok(())
    }

    fn open_race(
        &self,
        context: RaceContext,
        header: Option<PendingHeader>,
        line: &ClassifiedLine<'_>,
    ) -> Result<RaceSlot> {
        let header = match header {
            Some(Ok(header)) => header,
            Some(Err((race_index, reason))) => {
                return Ok(RaceSlot::Voided { race_index, reason })
            }
            None => {
                return Ok(RaceSlot::Voided {
                    race_index: None,
                    reason: RaceRejection::MissingHeader,
                })
            }
        };

        let decisive_factor = match decode(LineRole::DecisiveFactor, line.raw_text) {
            Ok(PartialRecord::DecisiveFactor(factor)) => factor,
            Ok(_) => String::new(),
            Err(error) => {
                return Ok(RaceSlot::Voided {
                    race_index: Some(header.race_index),
                    reason: error.into(),
                })
            }
        };

        let refs = ConditionRefs {
            weather: self
                .resolver
                .resolve_named(EntityKind::Weather, &header.weather)?,
            wind_direction: self
                .resolver
                .resolve_named(EntityKind::WindDirection, &header.wind_direction)?,
            decisive_factor: self
                .resolver
                .resolve_named(EntityKind::DecisiveFactor, &decisive_factor)?,
            special_rule: header
                .special_rule
                .as_deref()
                .map(|rule| self.resolver.resolve_named(EntityKind::SpecialRule, rule))
                .transpose()?,
        };

        let meta = RaceMeta {
            race_index: header.race_index,
            race_name: header.race_name,
            special_rule: header.special_rule,
            distance_m: header.distance_m,
            weather: header.weather,
            wind_direction: header.wind_direction,
            wind_speed_mps: header.wind_speed_mps,
            wave_height_cm: header.wave_height_cm,
            decisive_factor,
        };

        Ok(RaceSlot::Building(Box::new(RaceRecordBuilder::new(
            context, meta, refs,
        ))))
    }

    fn close_race(&self, stadium_code: u8, slot: RaceSlot, output: &mut ResultOutput) {
        match slot {
            RaceSlot::Idle => {}
            RaceSlot::Building(builder) => {
                let race_index = builder.race_index();
                match builder.build() {
                    Ok(record) => output.records.push(record),
                    Err(reason) => {
                        self.reject(stadium_code, Some(race_index), &reason);
                        output.races_rejected += 1;
                    }
                }
            }
            RaceSlot::Voided { race_index, reason } => {
                self.reject(stadium_code, race_index, &reason);
                output.races_rejected += 1;
            }
        }
    }

    fn reject(&self, stadium_code: u8, race_index: Option<u8>, reason: &RaceRejection) {
        match race_index {
            Some(race_index) => warn!(
                "{}: stadium {:02} race {}R rejected: {}",
                self.source, stadium_code, race_index, reason
            ),
            None => warn!(
                "{}: stadium {:02} race rejected: {}",
                self.source, stadium_code, reason
            ),
        }
    }

    /// Resolve the block's stadium by code, labelled with the official name.
    fn resolve_stadium(&self, block: &RawBlock<'_>, lines: &[ClassifiedLine<'_>]) -> Result<EntityRef> {
        let printed = lines
            .iter()
            .find(|line| line.role == LineRole::StadiumName)
            .and_then(|line| match decode(LineRole::StadiumName, line.raw_text) {
                Ok(PartialRecord::StadiumName(name)) => Some(name),
                _ => None,
            });
        let official = venue_name(block.stadium_code);

        match (&printed, official) {
            (Some(printed), Some(official)) if printed != official => warn!(
                "{}: stadium {:02} printed as '{}', expected '{}'",
                self.source, block.stadium_code, printed, official
            ),
            (_, None) => warn!(
                "{}: unknown stadium code {:02}",
                self.source, block.stadium_code
            ),
            _ => {}
        }

        let name = official
            .map(str::to_string)
            .or(printed)
            .unwrap_or_default()
            .replace(FULL_WIDTH_SPACE, "");
        self.resolver.resolve_stadium(block.stadium_code, &name)
    }

    fn resolve_boat(&self, stadium_code: u8, fields: BoatRowFields) -> Result<BoatResult> {
        let player_ref = self
            .resolver
            .resolve_player(fields.registration, &fields.player_name)?;
        let motor_ref = self.resolver.resolve_equipment(
            EntityKind::Motor,
            fields.motor_number,
            stadium_code,
            None,
        )?;
        let boat_ref = self.resolver.resolve_equipment(
            EntityKind::Boat,
            fields.boat_equipment_number,
            stadium_code,
            None,
        )?;

        Ok(BoatResult {
            boat_number: fields.boat_number,
            arrival_order: fields.arrival_order,
            registration: fields.registration,
            player_name: fields.player_name,
            player_ref,
            motor_number: fields.motor_number,
            motor_ref,
            boat_equipment_number: fields.boat_equipment_number,
            boat_ref,
            exhibition_time: fields.exhibition_time,
            starting_order: fields.starting_order,
            start_timing: fields.start_timing,
            race_time: fields.race_time,
        })
    }
}
