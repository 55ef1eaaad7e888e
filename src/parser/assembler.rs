//! Race record assembly and validation.

use crate::constants::{BOATS_PER_RACE, MAX_RACE_INDEX};
use crate::error::RaceRejection;
use crate::models::{BetType, BoatResult, EntityRef, RaceMeta, RaceRecord, RefundSchedule};
use chrono::NaiveDate;

use super::fields::RefundLine;
use super::refunds::RefundAccumulator;

/// Identity of the block a race belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaceContext {
    pub stadium_code: u8,
    pub stadium_ref: EntityRef,
    pub date: NaiveDate,
}

/// Resolved identities of the race-level dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionRefs {
    pub weather: EntityRef,
    pub wind_direction: EntityRef,
    pub decisive_factor: EntityRef,
    pub special_rule: Option<EntityRef>,
}

/// Collects the parts of one race. The header is required up front; boats
/// and payouts are added as their lines are decoded.
#[derive(Debug)]
pub struct RaceRecordBuilder {
    context: RaceContext,
    meta: RaceMeta,
    refs: ConditionRefs,
    boats: Vec<BoatResult>,
    refunds: RefundAccumulator,
}

impl RaceRecordBuilder {
    pub fn new(context: RaceContext, meta: RaceMeta, refs: ConditionRefs) -> Self {
        Self {
            context,
            meta,
            refs,
            boats: Vec::with_capacity(BOATS_PER_RACE),
            refunds: RefundAccumulator::new(),
        }
    }

    pub fn race_index(&self) -> u8 {
        self.meta.race_index
    }

    pub fn push_boat(&mut self, boat: BoatResult) {
        self.boats.push(boat);
    }

    pub fn push_refund(&mut self, line: &RefundLine) -> bool {
        self.refunds.push(line)
    }

    pub fn refunds(&self) -> &RefundSchedule {
        self.refunds.schedule()
    }

    /// Validate and produce the record. Boats come out ordered by number.
    pub fn build(self) -> Result<RaceRecord, RaceRejection> {
        let race_index = self.meta.race_index;
        if !(1..=MAX_RACE_INDEX).contains(&race_index) {
            return Err(RaceRejection::InvalidRaceIndex { race_index });
        }

        if self.boats.len() != BOATS_PER_RACE {
            return Err(RaceRejection::BoatCount {
                found: self.boats.len(),
            });
        }

        let mut seen = [false; BOATS_PER_RACE];
        for boat in &self.boats {
            let boat_number = boat.boat_number;
            if !(1..=BOATS_PER_RACE as u8).contains(&boat_number) {
                return Err(RaceRejection::InvalidBoatNumber { boat_number });
            }
            let slot = &mut seen[boat_number as usize - 1];
            if *slot {
                return Err(RaceRejection::DuplicateBoat { boat_number });
            }
            *slot = true;
        }

        let refunds = self.refunds.finish();
        if let Some(missing) = missing_refund(&self.boats, &refunds) {
            return Err(RaceRejection::MissingRefund(missing));
        }

        let mut boats = self.boats;
        boats.sort_by_key(|boat| boat.boat_number);
        let found = boats.len();
        let boats: [BoatResult; BOATS_PER_RACE] = boats
            .try_into()
            .map_err(|_| RaceRejection::BoatCount { found })?;

        Ok(RaceRecord {
            stadium_code: self.context.stadium_code,
            stadium_ref: self.context.stadium_ref,
            date: self.context.date,
            meta: self.meta,
            weather_ref: self.refs.weather,
            wind_direction_ref: self.refs.wind_direction,
            decisive_factor_ref: self.refs.decisive_factor,
            special_rule_ref: self.refs.special_rule,
            boats,
            refunds,
        })
    }
}

/// Bet categories the finish order obliges the dump to print. Dead heats
/// make exacta/trifecta inapplicable; a race nobody finished pays nothing.
pub fn applicable_bets(boats: &[BoatResult]) -> Vec<BetType> {
    let count = |place: u8| {
        boats
            .iter()
            .filter(|boat| boat.arrival_order == Some(place))
            .count()
    };
    let within = |last: u8| {
        boats
            .iter()
            .filter(|boat| boat.finished() && boat.arrival_order <= Some(last))
            .count()
    };

    let (first, second, third) = (count(1), count(2), count(3));
    let mut bets = Vec::new();
    if first == 0 {
        return bets;
    }
    bets.push(BetType::Win);
    bets.push(BetType::Place);
    if first == 1 && second == 1 {
        bets.push(BetType::Exacta);
    }
    if within(2) >= 2 {
        bets.push(BetType::Quinella);
    }
    if within(3) >= 2 {
        bets.push(BetType::BoxedQuinella);
    }
    if first == 1 && second == 1 && third == 1 {
        bets.push(BetType::Trifecta);
    }
    if within(3) >= 3 {
        bets.push(BetType::BoxedTrifecta);
    }
    bets
}

fn missing_refund(boats: &[BoatResult], refunds: &RefundSchedule) -> Option<BetType> {
    applicable_bets(boats)
        .into_iter()
        .find(|bet| !refunds.is_observed(*bet))
}
