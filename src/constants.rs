//! Markers, fixed column layouts and lookup tables for the race text dumps.
//!
//! Column ranges are character offsets (half-open, `start..end`). A full-width
//! character occupies one column.

use std::ops::Range;

// =============================================================================
// Block delimiters
// =============================================================================

pub const RESULT_OPEN_TAG: &str = "KBGN";
pub const RESULT_CLOSE_TAG: &str = "KEND";
pub const PARAMETER_OPEN_TAG: &str = "BBGN";
pub const PARAMETER_CLOSE_TAG: &str = "BEND";

// =============================================================================
// Result block markers
// =============================================================================

/// Present anywhere in a block whose whole meet was called off.
pub const VOID_MARKER: &str = "レース不成立";

/// Column titles that open the boat-result table of every race.
pub const TABLE_HEADER: &str =
    "  着 艇 登番 　選　手　名　　ﾓｰﾀｰ ﾎﾞｰﾄ 展示 進入 ｽﾀｰﾄﾀｲﾐﾝｸ ﾚｰｽﾀｲﾑ";

/// Win payout label; the first refund row of every settled race.
pub const REFUND_MARKER: &str = "単勝";
/// Ends the payout fields of a refund row (`人気     1`).
pub const POPULARITY_LABEL: &str = "人気";

/// Separates the race-header fields from the weather block (`H1800m`).
pub const DISTANCE_MARKER: char = 'H';
pub const WIND_LABEL: &str = "風";
pub const WAVE_LABEL: &str = "波";

/// Special-rule text printed for races run under standard conditions.
pub const NO_SPECIAL_RULE: &str = "特別規定なし";

pub const FULL_WIDTH_SPACE: char = '\u{3000}';

/// Arrival value recorded for a boat that was disqualified, capsized, etc.
pub const ARRIVAL_DID_NOT_FINISH: u8 = 99;

/// Lines the classifier holds back while waiting to learn their role.
pub const LOOKBACK_DEPTH: usize = 3;

pub const BOATS_PER_RACE: usize = 6;
pub const MAX_RACE_INDEX: u8 = 12;

// =============================================================================
// Result block column layouts
// =============================================================================

pub mod result_columns {
    use super::Range;

    pub const STADIUM_NAME: Range<usize> = 0..3;

    pub const RACE_INDEX: Range<usize> = 0..5;
    pub const RACE_NAME: Range<usize> = 12..20;
    /// Special-rule text begins here and runs up to the distance marker.
    pub const SPECIAL_RULE_START: usize = 20;

    pub const ARRIVAL: Range<usize> = 2..4;
    pub const BOAT_NUMBER: Range<usize> = 6..7;
    pub const REGISTRATION: Range<usize> = 8..12;
    pub const PLAYER_NAME: Range<usize> = 13..21;
    pub const MOTOR_NUMBER: Range<usize> = 21..25;
    pub const BOAT_EQUIPMENT_NUMBER: Range<usize> = 25..30;
    pub const EXHIBITION_TIME: Range<usize> = 30..36;
    pub const STARTING_ORDER: Range<usize> = 36..40;
    pub const START_TIMING: Range<usize> = 40..48;
    pub const RACE_TIME: Range<usize> = 48..57;
    /// Shortest line that still carries every required boat-row field.
    pub const BOAT_ROW_MIN_WIDTH: usize = 30;
}

// =============================================================================
// Parameter block markers and column layout
// =============================================================================

/// Prefix of the stadium line that opens a parameter block.
pub const PARAMETER_STADIUM_PREFIX: &str = "ボートレース";
pub const PARAMETER_SEPARATOR_PREFIX: &str = "---";
pub const PARAMETER_HEADER_PREFIXES: [&str; 2] = ["艇", "番"];

pub mod parameter_columns {
    use super::Range;

    pub const BOAT_NUMBER: Range<usize> = 0..1;
    pub const REGISTRATION: Range<usize> = 2..6;
    pub const PLAYER_NAME: Range<usize> = 6..10;
    pub const AGE: Range<usize> = 10..12;
    pub const BRANCH: Range<usize> = 12..14;
    pub const WEIGHT: Range<usize> = 14..16;
    pub const RANK: Range<usize> = 16..18;
    pub const NATIONAL_WIN_RATE: Range<usize> = 18..23;
    pub const NATIONAL_TOP2_RATE: Range<usize> = 23..29;
    pub const LOCAL_WIN_RATE: Range<usize> = 29..34;
    pub const LOCAL_TOP2_RATE: Range<usize> = 34..40;
    pub const MOTOR_NUMBER: Range<usize> = 40..43;
    pub const MOTOR_TOP2_RATE: Range<usize> = 43..49;
    pub const BOAT_EQUIPMENT_NUMBER: Range<usize> = 49..52;
    pub const BOAT_TOP2_RATE: Range<usize> = 52..58;
    pub const ROW_MIN_WIDTH: usize = 18;
}

// =============================================================================
// Stadiums
// =============================================================================

/// Official stadium codes and names, in code order.
pub const VENUES: [(u8, &str); 24] = [
    (1, "桐生"),
    (2, "戸田"),
    (3, "江戸川"),
    (4, "平和島"),
    (5, "多摩川"),
    (6, "浜名湖"),
    (7, "蒲郡"),
    (8, "常滑"),
    (9, "津"),
    (10, "三国"),
    (11, "びわこ"),
    (12, "住之江"),
    (13, "尼崎"),
    (14, "鳴門"),
    (15, "丸亀"),
    (16, "児島"),
    (17, "宮島"),
    (18, "徳山"),
    (19, "下関"),
    (20, "若松"),
    (21, "芦屋"),
    (22, "福岡"),
    (23, "唐津"),
    (24, "大村"),
];

/// Look up the official name of a stadium code.
pub fn venue_name(code: u8) -> Option<&'static str> {
    VENUES
        .iter()
        .find(|(venue_code, _)| *venue_code == code)
        .map(|(_, name)| *name)
}
