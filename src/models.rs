//! Core data structures for boat-race record processing.
//!
//! Defines the raw blocks and classified lines produced while parsing, the
//! validated race aggregate, the pre-race performance snapshots, the
//! reference-entity identities handed out by the registry, and the run
//! statistics reported by the batch processor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use crate::constants::{
    PARAMETER_CLOSE_TAG, PARAMETER_OPEN_TAG, RESULT_CLOSE_TAG, RESULT_OPEN_TAG,
};

// =============================================================================
// Blocks and lines
// =============================================================================

/// Which kind of dump a block was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    Result,
    Parameter,
}

impl SectionKind {
    pub fn open_tag(&self) -> &'static str {
        match self {
            SectionKind::Result => RESULT_OPEN_TAG,
            SectionKind::Parameter => PARAMETER_OPEN_TAG,
        }
    }

    pub fn close_tag(&self) -> &'static str {
        match self {
            SectionKind::Result => RESULT_CLOSE_TAG,
            SectionKind::Parameter => PARAMETER_CLOSE_TAG,
        }
    }
}

/// Text between one pair of matching open/close tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBlock<'a> {
    pub stadium_code: u8,
    pub section_kind: SectionKind,
    pub text: &'a str,
    /// Byte offset of the opening tag within the source text.
    pub offset: usize,
}

/// Role of a single line inside a result block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineRole {
    StadiumName,
    RaceHeader,
    /// Boat-table column titles; the decisive factor trails the titles.
    DecisiveFactor,
    RaceSeparator,
    BoatResult,
    Refund,
    Blank,
    /// Synthetic marker closing the race currently being built.
    Terminator,
    Unclassified,
    ParameterRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedLine<'a> {
    pub role: LineRole,
    pub raw_text: &'a str,
    pub line_index: usize,
}

// =============================================================================
// Race records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceMeta {
    pub race_index: u8,
    pub race_name: String,
    pub special_rule: Option<String>,
    pub distance_m: Option<u32>,
    pub weather: String,
    pub wind_direction: String,
    pub wind_speed_mps: Option<i32>,
    pub wave_height_cm: Option<i32>,
    pub decisive_factor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoatResult {
    pub boat_number: u8,
    /// `None` when blank, [`crate::constants::ARRIVAL_DID_NOT_FINISH`] when the
    /// boat did not finish.
    pub arrival_order: Option<u8>,
    pub registration: u32,
    pub player_name: String,
    pub player_ref: EntityRef,
    pub motor_number: u32,
    pub motor_ref: EntityRef,
    pub boat_equipment_number: u32,
    pub boat_ref: EntityRef,
    pub exhibition_time: Option<f32>,
    pub starting_order: Option<u8>,
    pub start_timing: Option<f32>,
    pub race_time: Option<Duration>,
}

impl BoatResult {
    /// Finished in one of the six paying positions.
    pub fn finished(&self) -> bool {
        matches!(self.arrival_order, Some(place) if (1..=6).contains(&place))
    }
}

/// Bet categories printed in the payout section of a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BetType {
    Win,
    Place,
    Exacta,
    Quinella,
    BoxedQuinella,
    Trifecta,
    BoxedTrifecta,
}

impl BetType {
    pub const ALL: [BetType; 7] = [
        BetType::Win,
        BetType::Place,
        BetType::Exacta,
        BetType::Quinella,
        BetType::BoxedQuinella,
        BetType::Trifecta,
        BetType::BoxedTrifecta,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BetType::Win => "単勝",
            BetType::Place => "複勝",
            BetType::Exacta => "２連単",
            BetType::Quinella => "２連複",
            BetType::BoxedQuinella => "拡連複",
            BetType::Trifecta => "３連単",
            BetType::BoxedTrifecta => "３連複",
        }
    }

    /// Match a label at the start of `token`. Also returns what follows the
    /// label, non-empty when the combination was printed without a gap.
    pub fn strip_label(token: &str) -> Option<(Self, &str)> {
        Self::ALL
            .into_iter()
            .find_map(|bet| token.strip_prefix(bet.label()).map(|rest| (bet, rest)))
    }

    /// Most payout lines a category can print for one race.
    pub fn max_lines(&self) -> usize {
        match self {
            BetType::Place => 2,
            BetType::BoxedQuinella => 3,
            _ => 1,
        }
    }
}

/// Payout amounts in yen. A category that was printed with an unreadable
/// amount is still listed in `observed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefundSchedule {
    pub win: Option<i64>,
    pub place_1: Option<i64>,
    pub place_2: Option<i64>,
    pub exacta: Option<i64>,
    pub quinella: Option<i64>,
    pub boxed_quinella_1: Option<i64>,
    pub boxed_quinella_2: Option<i64>,
    pub boxed_quinella_3: Option<i64>,
    pub trifecta: Option<i64>,
    pub boxed_trifecta: Option<i64>,
    pub observed: BTreeSet<BetType>,
}

impl RefundSchedule {
    pub fn is_observed(&self, bet: BetType) -> bool {
        self.observed.contains(&bet)
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }
}

/// One validated race: header, six boats ordered by boat number, payouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceRecord {
    pub stadium_code: u8,
    pub stadium_ref: EntityRef,
    pub date: NaiveDate,
    pub meta: RaceMeta,
    pub weather_ref: EntityRef,
    pub wind_direction_ref: EntityRef,
    pub decisive_factor_ref: EntityRef,
    pub special_rule_ref: Option<EntityRef>,
    pub boats: [BoatResult; 6],
    pub refunds: RefundSchedule,
}

// =============================================================================
// Parameter snapshots
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_id: u32,
    pub player_ref: EntityRef,
    pub stadium_ref: EntityRef,
    pub date: NaiveDate,
    pub race_index: Option<u8>,
    pub boat_number: Option<u8>,
    pub age: Option<u8>,
    pub weight: Option<u8>,
    pub branch_ref: Option<EntityRef>,
    pub rank_ref: Option<EntityRef>,
    pub national_win_rate: Option<f32>,
    pub national_top2_rate: Option<f32>,
    pub local_win_rate: Option<f32>,
    pub local_top2_rate: Option<f32>,
}

/// Place-rate snapshot for a motor or a boat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSnapshot {
    pub number: u32,
    pub equipment_ref: EntityRef,
    pub stadium_ref: EntityRef,
    pub date: NaiveDate,
    pub top2_rate: Option<f32>,
}

// =============================================================================
// Reference entities
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Stadium,
    Weather,
    WindDirection,
    DecisiveFactor,
    SpecialRule,
    Player,
    Branch,
    Rank,
    Motor,
    Boat,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Stadium => "stadium",
            EntityKind::Weather => "weather",
            EntityKind::WindDirection => "wind_direction",
            EntityKind::DecisiveFactor => "decisive_factor",
            EntityKind::SpecialRule => "special_rule",
            EntityKind::Player => "player",
            EntityKind::Branch => "branch",
            EntityKind::Rank => "rank",
            EntityKind::Motor => "motor",
            EntityKind::Boat => "boat",
        };
        f.write_str(name)
    }
}

/// Surrogate identity assigned on first sight of a natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

/// Domain identifier used to detect that two observations are the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NaturalKey {
    /// Small dimensions identified by their printed text.
    Named { kind: EntityKind, name: String },
    Stadium { code: u8 },
    Player { registration: u32 },
    /// Motors and boats are numbered per stadium.
    Equipment {
        kind: EntityKind,
        number: u32,
        stadium_code: u8,
    },
}

impl NaturalKey {
    pub fn named(kind: EntityKind, name: impl Into<String>) -> Self {
        NaturalKey::Named {
            kind,
            name: name.into(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            NaturalKey::Named { kind, .. } => *kind,
            NaturalKey::Stadium { .. } => EntityKind::Stadium,
            NaturalKey::Player { .. } => EntityKind::Player,
            NaturalKey::Equipment { kind, .. } => *kind,
        }
    }

    pub fn is_equipment(&self) -> bool {
        matches!(self, NaturalKey::Equipment { .. })
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NaturalKey::Named { name, .. } => f.write_str(name),
            NaturalKey::Stadium { code } => write!(f, "{:02}", code),
            NaturalKey::Player { registration } => write!(f, "{}", registration),
            NaturalKey::Equipment {
                number,
                stadium_code,
                ..
            } => write!(f, "{:02}#{}", stadium_code, number),
        }
    }
}

/// Attributes supplied by the caller when an entity may need creating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityAttributes {
    pub label: Option<String>,
    pub rate: Option<f32>,
}

impl EntityAttributes {
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            rate: None,
        }
    }

    pub fn with_rate(mut self, rate: Option<f32>) -> Self {
        self.rate = rate;
        self
    }
}

/// One stored entity. Equipment keys may hold several eras; every other key
/// holds exactly one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub key: NaturalKey,
    pub era: u32,
    pub label: Option<String>,
    pub rate: Option<f32>,
}

impl EntityRecord {
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            kind: self.key.kind(),
            id: self.id,
        }
    }
}

// =============================================================================
// Run statistics
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub races_parsed: usize,
    pub races_rejected: usize,
    pub blocks_voided: usize,
    pub snapshots_emitted: usize,
}

impl BatchStats {
    pub fn merge(&mut self, other: &BatchStats) {
        self.files_processed += other.files_processed;
        self.files_skipped += other.files_skipped;
        self.races_parsed += other.races_parsed;
        self.races_rejected += other.races_rejected;
        self.blocks_voided += other.blocks_voided;
        self.snapshots_emitted += other.snapshots_emitted;
    }
}
