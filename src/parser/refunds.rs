//! Payout accumulation for one race.
//!
//! Boxed quinella prints up to three winning pairs, one per line, with only
//! the first line labelled. Place prints one or two winners, either side by
//! side on the labelled line or with the second on an unlabelled line.
//! Unlabelled lines are attached to the most recent label while that
//! category still has room.

use crate::models::{BetType, RefundSchedule};
use tracing::debug;

use super::fields::RefundLine;

#[derive(Debug, Default)]
pub struct RefundAccumulator {
    schedule: RefundSchedule,
    current: Option<BetType>,
    slots_used: usize,
}

impl RefundAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one decoded payout line. Returns `false` when the line was
    /// ignored (a repeated label, or a continuation with nowhere to go).
    pub fn push(&mut self, line: &RefundLine) -> bool {
        match line.bet_type {
            Some(bet) => {
                if self.schedule.is_observed(bet) {
                    debug!("Ignoring repeated {:?} payout line", bet);
                    self.current = None;
                    return false;
                }
                self.schedule.observed.insert(bet);
                self.current = Some(bet);
                self.slots_used = 0;
                for payout in &line.payouts {
                    self.fill(bet, payout.amount);
                }
                true
            }
            None => match self.current {
                Some(bet) if self.slots_used < bet.max_lines() => {
                    for payout in &line.payouts {
                        self.fill(bet, payout.amount);
                    }
                    true
                }
                _ => {
                    debug!("Ignoring unlabelled payout line with no open category");
                    false
                }
            },
        }
    }

    /// Payouts gathered so far.
    pub fn schedule(&self) -> &RefundSchedule {
        &self.schedule
    }

    pub fn finish(self) -> RefundSchedule {
        self.schedule
    }

    fn fill(&mut self, bet: BetType, amount: Option<i64>) {
        if self.slots_used >= bet.max_lines() {
            return;
        }
        let slot = match (bet, self.slots_used) {
            (BetType::Win, _) => &mut self.schedule.win,
            (BetType::Place, 0) => &mut self.schedule.place_1,
            (BetType::Place, _) => &mut self.schedule.place_2,
            (BetType::Exacta, _) => &mut self.schedule.exacta,
            (BetType::Quinella, _) => &mut self.schedule.quinella,
            (BetType::BoxedQuinella, 0) => &mut self.schedule.boxed_quinella_1,
            (BetType::BoxedQuinella, 1) => &mut self.schedule.boxed_quinella_2,
            (BetType::BoxedQuinella, _) => &mut self.schedule.boxed_quinella_3,
            (BetType::Trifecta, _) => &mut self.schedule.trifecta,
            (BetType::BoxedTrifecta, _) => &mut self.schedule.boxed_trifecta,
        };
        *slot = amount;
        self.slots_used += 1;
    }
}
