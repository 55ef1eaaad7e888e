//! Line classification for result blocks.
//!
//! The role of a race-header line is only known once the boat-table header
//! that follows it has been seen, so candidate lines are held in a small
//! lookback buffer and assigned a role retroactively. All state changes go
//! through [`transition`].

use crate::constants::{
    result_columns as rc, LOOKBACK_DEPTH, REFUND_MARKER, TABLE_HEADER, VOID_MARKER,
};
use crate::models::{ClassifiedLine, LineRole, RawBlock};
use std::collections::VecDeque;

use super::fields::slice_cols;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierState {
    AwaitingStadiumName,
    AwaitingRaceHeader,
    InBoatRows,
    InRefundRows,
    BlockDone,
}

/// What to do with the line that caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The line's role is known now.
    Emit(LineRole),
    /// Hold the line; its role depends on what follows.
    Defer,
    /// Boat-table header. The newest held non-blank line becomes the race
    /// header, and the table line carries the decisive factor.
    OpenRace { close_previous: bool },
    /// Blank line after the payout rows.
    CloseRace,
}

/// Single transition function of the classifier.
pub fn transition(state: ClassifierState, line: &str) -> (ClassifierState, Action) {
    use ClassifierState::*;

    let blank = line.trim().is_empty();

    match state {
        BlockDone => (BlockDone, Action::Emit(LineRole::Unclassified)),
        AwaitingStadiumName if blank => (AwaitingStadiumName, Action::Emit(LineRole::Blank)),
        AwaitingStadiumName => (AwaitingRaceHeader, Action::Emit(LineRole::StadiumName)),
        _ if line.contains(TABLE_HEADER) => (
            InBoatRows,
            Action::OpenRace {
                close_previous: matches!(state, InBoatRows | InRefundRows),
            },
        ),
        AwaitingRaceHeader if is_separator(line) => {
            (AwaitingRaceHeader, Action::Emit(LineRole::RaceSeparator))
        }
        AwaitingRaceHeader => (AwaitingRaceHeader, Action::Defer),
        InBoatRows if blank => (InBoatRows, Action::Emit(LineRole::Blank)),
        InBoatRows if is_separator(line) => (InBoatRows, Action::Emit(LineRole::RaceSeparator)),
        InBoatRows if is_refund_start(line) => (InRefundRows, Action::Emit(LineRole::Refund)),
        InBoatRows if looks_like_boat_row(line) => (InBoatRows, Action::Emit(LineRole::BoatResult)),
        InBoatRows => (InBoatRows, Action::Defer),
        InRefundRows if blank => (AwaitingRaceHeader, Action::CloseRace),
        InRefundRows => (InRefundRows, Action::Emit(LineRole::Refund)),
    }
}

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-')
}

fn is_refund_start(line: &str) -> bool {
    line.contains(REFUND_MARKER)
}

/// Arrival and boat columns sit behind two leading spaces.
fn looks_like_boat_row(line: &str) -> bool {
    line.chars().count() >= rc::BOAT_ROW_MIN_WIDTH
        && slice_cols(line, 0..2).trim().is_empty()
        && !slice_cols(line, rc::BOAT_NUMBER).trim().is_empty()
}

/// Stateful classifier over the lines of one block.
#[derive(Debug)]
pub struct LineClassifier<'a> {
    state: ClassifierState,
    pending: VecDeque<(usize, &'a str)>,
    output: Vec<ClassifiedLine<'a>>,
}

impl<'a> Default for LineClassifier<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> LineClassifier<'a> {
    pub fn new() -> Self {
        Self {
            state: ClassifierState::AwaitingStadiumName,
            pending: VecDeque::with_capacity(LOOKBACK_DEPTH + 1),
            output: Vec::new(),
        }
    }

    /// Classify every line of `text`.
    pub fn classify(text: &'a str) -> Vec<ClassifiedLine<'a>> {
        let mut classifier = Self::new();
        for (line_index, line) in text.lines().enumerate() {
            classifier.push(line_index, line);
        }
        classifier.finish()
    }

    pub fn push(&mut self, line_index: usize, line: &'a str) {
        let (next, action) = transition(self.state, line);
        self.state = next;

        match action {
            Action::Emit(role) => {
                self.flush_pending();
                self.emit(role, line, line_index);
            }
            Action::Defer => {
                self.pending.push_back((line_index, line));
                if self.pending.len() > LOOKBACK_DEPTH {
                    if let Some((index, stale)) = self.pending.pop_front() {
                        self.emit(fallback_role(stale), stale, index);
                    }
                }
            }
            Action::OpenRace { close_previous } => {
                if close_previous {
                    self.emit(LineRole::Terminator, "", line_index);
                }
                self.promote_race_header();
                self.emit(LineRole::DecisiveFactor, line, line_index);
            }
            Action::CloseRace => {
                self.flush_pending();
                self.emit(LineRole::Terminator, line, line_index);
            }
        }
    }

    /// Flush held lines and close any race still open.
    pub fn finish(mut self) -> Vec<ClassifiedLine<'a>> {
        let open_race = matches!(
            self.state,
            ClassifierState::InBoatRows | ClassifierState::InRefundRows
        );
        let last_index = self
            .pending
            .back()
            .map(|(index, _)| *index)
            .or_else(|| self.output.last().map(|line| line.line_index))
            .unwrap_or(0);

        self.flush_pending();
        if open_race {
            self.emit(LineRole::Terminator, "", last_index + 1);
        }
        self.state = ClassifierState::BlockDone;
        self.output
    }

    fn promote_race_header(&mut self) {
        let header_at = self
            .pending
            .iter()
            .rposition(|(_, line)| !line.trim().is_empty());

        let pending: Vec<_> = self.pending.drain(..).collect();
        for (position, (index, line)) in pending.into_iter().enumerate() {
            let role = if Some(position) == header_at {
                LineRole::RaceHeader
            } else {
                fallback_role(line)
            };
            self.emit(role, line, index);
        }
    }

    fn flush_pending(&mut self) {
        while let Some((index, line)) = self.pending.pop_front() {
            self.emit(fallback_role(line), line, index);
        }
    }

    fn emit(&mut self, role: LineRole, raw_text: &'a str, line_index: usize) {
        self.output.push(ClassifiedLine {
            role,
            raw_text,
            line_index,
        });
    }
}

fn fallback_role(line: &str) -> LineRole {
    if line.trim().is_empty() {
        LineRole::Blank
    } else {
        LineRole::Unclassified
    }
}

/// Classification of a whole block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOutcome<'a> {
    /// The meet was called off; nothing in the block is usable.
    Void,
    Lines(Vec<ClassifiedLine<'a>>),
}

/// Classify a block, short-circuiting on the void marker before any line is
/// examined.
pub fn classify_block<'a>(block: &RawBlock<'a>) -> BlockOutcome<'a> {
    if block.text.contains(VOID_MARKER) {
        return BlockOutcome::Void;
    }
    BlockOutcome::Lines(LineClassifier::classify(block.text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionKind;

    fn roles(lines: &[ClassifiedLine<'_>]) -> Vec<LineRole> {
        lines.iter().map(|line| line.role).collect()
    }

    const WIN_ROW: &str = "        単勝     1          140";
    const CONTINUATION_ROW: &str = "                 1-3        200  人気     3";

    fn boat_row(boat: u8) -> String {
        format!(
            "  {:>2}  {} {} {:<8}{:>4}{:>5}{:>6}{:>4}{:>8}{:>9}",
            format!("0{}", boat),
            boat,
            4000 + boat as u32,
            "選手",
            10 + boat,
            20 + boat,
            "6.80",
            boat,
            "0.15",
            "1.50.0"
        )
    }

    #[test]
    fn test_transition_table() {
        use ClassifierState::*;

        assert_eq!(
            transition(AwaitingStadiumName, ""),
            (AwaitingStadiumName, Action::Emit(LineRole::Blank))
        );
        assert_eq!(
            transition(AwaitingStadiumName, "徳　山［成績］"),
            (AwaitingRaceHeader, Action::Emit(LineRole::StadiumName))
        );
        assert_eq!(
            transition(AwaitingRaceHeader, "   1R       予選"),
            (AwaitingRaceHeader, Action::Defer)
        );
        assert_eq!(
            transition(AwaitingRaceHeader, TABLE_HEADER),
            (
                InBoatRows,
                Action::OpenRace {
                    close_previous: false
                }
            )
        );
        assert_eq!(
            transition(InRefundRows, TABLE_HEADER),
            (
                InBoatRows,
                Action::OpenRace {
                    close_previous: true
                }
            )
        );
        assert_eq!(
            transition(InBoatRows, "-------------------------"),
            (InBoatRows, Action::Emit(LineRole::RaceSeparator))
        );
        assert_eq!(
            transition(InBoatRows, &boat_row(1)),
            (InBoatRows, Action::Emit(LineRole::BoatResult))
        );
        assert_eq!(
            transition(InBoatRows, WIN_ROW),
            (InRefundRows, Action::Emit(LineRole::Refund))
        );
        assert_eq!(
            transition(InRefundRows, CONTINUATION_ROW),
            (InRefundRows, Action::Emit(LineRole::Refund))
        );
        assert_eq!(
            transition(InRefundRows, "   "),
            (AwaitingRaceHeader, Action::CloseRace)
        );
        assert_eq!(
            transition(BlockDone, "anything"),
            (BlockDone, Action::Emit(LineRole::Unclassified))
        );
    }

    #[test]
    fn test_race_header_is_reclassified_retroactively() {
        let text = format!(
            "\n徳　山［成績］\n\n  preamble\n   1R       予選\n{} 逃げ\n---\n{}\n\n{}\n\n",
            TABLE_HEADER,
            boat_row(1),
            WIN_ROW
        );
        let lines = LineClassifier::classify(&text);

        assert_eq!(
            roles(&lines),
            vec![
                LineRole::Blank,
                LineRole::StadiumName,
                LineRole::Blank,
                LineRole::Unclassified,
                LineRole::RaceHeader,
                LineRole::DecisiveFactor,
                LineRole::RaceSeparator,
                LineRole::BoatResult,
                LineRole::Blank,
                LineRole::Refund,
                LineRole::Terminator,
            ]
        );
        assert_eq!(lines[4].raw_text, "   1R       予選");
        let indexes: Vec<usize> = lines.iter().map(|line| line.line_index).collect();
        assert_eq!(indexes, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn test_lookback_overflow_is_unclassified() {
        let text = format!(
            "徳　山［成績］\na\nb\nc\nd\n   1R\n{}",
            TABLE_HEADER
        );
        let lines = LineClassifier::classify(&text);

        assert_eq!(lines[1].role, LineRole::Unclassified);
        assert_eq!(lines[1].raw_text, "a");
        let header: Vec<_> = lines
            .iter()
            .filter(|line| line.role == LineRole::RaceHeader)
            .collect();
        assert_eq!(header.len(), 1);
        assert_eq!(header[0].raw_text, "   1R");
    }

    #[test]
    fn test_consecutive_races_are_terminated() {
        let text = format!(
            "徳　山［成績］\n   1R\n{t}\n{b}\n   2R\n{t}\n{b}\n",
            t = TABLE_HEADER,
            b = boat_row(1)
        );
        let lines = LineClassifier::classify(&text);

        assert_eq!(
            roles(&lines),
            vec![
                LineRole::StadiumName,
                LineRole::RaceHeader,
                LineRole::DecisiveFactor,
                LineRole::BoatResult,
                LineRole::Terminator,
                LineRole::RaceHeader,
                LineRole::DecisiveFactor,
                LineRole::BoatResult,
                LineRole::Terminator,
            ]
        );
    }

    #[test]
    fn test_void_block_short_circuits() {
        let block = RawBlock {
            stadium_code: 18,
            section_kind: SectionKind::Result,
            text: "\n徳　山［成績］\n本日の競走はレース不成立となりました\n",
            offset: 0,
        };
        assert_eq!(classify_block(&block), BlockOutcome::Void);
    }

    #[test]
    fn test_empty_block() {
        assert!(LineClassifier::classify("").is_empty());
    }
}
