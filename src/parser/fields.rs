//! Fixed-column field decoding.
//!
//! Every line role has a fixed table of character ranges. Optional fields
//! that fail to parse become `None`; only a line that is structurally
//! unusable (too short, missing a marker, or a required identifier that is
//! not a number) yields a [`LineDecodeError`].

use crate::constants::{
    parameter_columns as pc, result_columns as rc, DISTANCE_MARKER, FULL_WIDTH_SPACE,
    NO_SPECIAL_RULE, POPULARITY_LABEL, TABLE_HEADER, WAVE_LABEL, WIND_LABEL, ARRIVAL_DID_NOT_FINISH,
};
use crate::error::LineDecodeError;
use crate::models::{BetType, LineRole};
use std::ops::Range;
use std::str::FromStr;
use std::time::Duration;

/// Fields decoded from one line, tagged by the role it was decoded for.
#[derive(Debug, Clone, PartialEq)]
pub enum PartialRecord {
    StadiumName(String),
    RaceHeader(RaceHeaderFields),
    DecisiveFactor(String),
    BoatRow(BoatRowFields),
    Refund(RefundLine),
    ParameterRow(ParameterRowFields),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaceHeaderFields {
    pub race_index: u8,
    pub race_name: String,
    pub special_rule: Option<String>,
    pub distance_m: Option<u32>,
    pub weather: String,
    pub wind_direction: String,
    pub wind_speed_mps: Option<i32>,
    pub wave_height_cm: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoatRowFields {
    pub arrival_order: Option<u8>,
    pub boat_number: u8,
    pub registration: u32,
    pub player_name: String,
    pub motor_number: u32,
    pub boat_equipment_number: u32,
    pub exhibition_time: Option<f32>,
    pub starting_order: Option<u8>,
    pub start_timing: Option<f32>,
    pub race_time: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payout {
    pub combination: String,
    /// `None` for special payouts printed without a figure.
    pub amount: Option<i64>,
}

/// One physical payout line. `bet_type` is `None` for unlabelled
/// continuation lines.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundLine {
    pub bet_type: Option<BetType>,
    pub payouts: Vec<Payout>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRowFields {
    pub boat_number: u8,
    pub registration: u32,
    pub player_name: String,
    pub age: Option<u8>,
    pub branch: Option<String>,
    pub weight: Option<u8>,
    pub rank: Option<String>,
    pub national_win_rate: Option<f32>,
    pub national_top2_rate: Option<f32>,
    pub local_win_rate: Option<f32>,
    pub local_top2_rate: Option<f32>,
    pub motor_number: Option<u32>,
    pub motor_top2_rate: Option<f32>,
    pub boat_equipment_number: Option<u32>,
    pub boat_top2_rate: Option<f32>,
}

/// Decode `line` according to the column table of `role`.
pub fn decode(role: LineRole, line: &str) -> Result<PartialRecord, LineDecodeError> {
    let columns = Columns::new(line);
    match role {
        LineRole::StadiumName => decode_stadium_name(&columns).map(PartialRecord::StadiumName),
        LineRole::RaceHeader => decode_race_header(&columns).map(PartialRecord::RaceHeader),
        LineRole::DecisiveFactor => decode_decisive_factor(line).map(PartialRecord::DecisiveFactor),
        LineRole::BoatResult => decode_boat_row(&columns).map(PartialRecord::BoatRow),
        LineRole::Refund => decode_refund(line).map(PartialRecord::Refund),
        LineRole::ParameterRow => decode_parameter_row(line).map(PartialRecord::ParameterRow),
        LineRole::RaceSeparator
        | LineRole::Blank
        | LineRole::Terminator
        | LineRole::Unclassified => Err(LineDecodeError::NotDecodable { role }),
    }
}

/// Decode one boat row of a parameter block.
pub fn decode_parameter_row(line: &str) -> Result<ParameterRowFields, LineDecodeError> {
    let columns = Columns::new(line);
    columns.require_width(LineRole::ParameterRow, pc::ROW_MIN_WIDTH)?;

    Ok(ParameterRowFields {
        boat_number: required(&columns, pc::BOAT_NUMBER, "boat_number")?,
        registration: required(&columns, pc::REGISTRATION, "registration")?,
        player_name: strip_spaces(&columns.slice(pc::PLAYER_NAME)),
        age: parse_int(&columns.slice(pc::AGE)),
        branch: non_empty(strip_spaces(&columns.slice(pc::BRANCH))),
        weight: parse_int(&columns.slice(pc::WEIGHT)),
        rank: non_empty(strip_spaces(&columns.slice(pc::RANK))),
        national_win_rate: parse_decimal(&columns.slice(pc::NATIONAL_WIN_RATE)),
        national_top2_rate: parse_decimal(&columns.slice(pc::NATIONAL_TOP2_RATE)),
        local_win_rate: parse_decimal(&columns.slice(pc::LOCAL_WIN_RATE)),
        local_top2_rate: parse_decimal(&columns.slice(pc::LOCAL_TOP2_RATE)),
        motor_number: parse_int(&columns.slice(pc::MOTOR_NUMBER)),
        motor_top2_rate: parse_decimal(&columns.slice(pc::MOTOR_TOP2_RATE)),
        boat_equipment_number: parse_int(&columns.slice(pc::BOAT_EQUIPMENT_NUMBER)),
        boat_top2_rate: parse_decimal(&columns.slice(pc::BOAT_TOP2_RATE)),
    })
}

fn decode_stadium_name(columns: &Columns) -> Result<String, LineDecodeError> {
    let name = strip_spaces(&columns.slice(rc::STADIUM_NAME));
    if name.is_empty() {
        return Err(LineDecodeError::InvalidField {
            field: "stadium_name",
            value: columns.slice(rc::STADIUM_NAME),
        });
    }
    Ok(name)
}

fn decode_race_header(columns: &Columns) -> Result<RaceHeaderFields, LineDecodeError> {
    columns.require_width(LineRole::RaceHeader, rc::SPECIAL_RULE_START + 1)?;

    let index_text = columns.slice(rc::RACE_INDEX);
    let race_index = parse_race_index(&index_text).ok_or(LineDecodeError::InvalidField {
        field: "race_index",
        value: index_text.clone(),
    })?;

    let marker = columns
        .find_distance_marker(rc::RACE_NAME.start)
        .ok_or(LineDecodeError::MissingMarker {
            role: LineRole::RaceHeader,
            marker: "H",
        })?;

    let race_name = trim(&columns.slice(rc::RACE_NAME.start..marker.min(rc::RACE_NAME.end)));
    let special_rule = if marker > rc::SPECIAL_RULE_START {
        non_empty(trim(&columns.slice(rc::SPECIAL_RULE_START..marker)))
            .filter(|rule| rule != NO_SPECIAL_RULE)
    } else {
        None
    };

    let conditions = columns.slice(marker..columns.len()).replace(FULL_WIDTH_SPACE, " ");
    let tokens: Vec<&str> = conditions.split_whitespace().collect();

    let distance_m = tokens
        .first()
        .and_then(|token| parse_int(token.trim_start_matches(DISTANCE_MARKER).trim_end_matches('m')));

    let (wind_at, direction_glued) =
        find_label(&tokens, WIND_LABEL).ok_or(LineDecodeError::MissingMarker {
            role: LineRole::RaceHeader,
            marker: WIND_LABEL,
        })?;

    let weather = tokens
        .get(1)
        .filter(|_| wind_at > 1)
        .map(|token| token.to_string())
        .ok_or(LineDecodeError::InvalidField {
            field: "weather",
            value: conditions.clone(),
        })?;

    let (wind_direction, speed_at) = match direction_glued {
        Some(direction) => (direction.to_string(), wind_at + 1),
        None => match tokens.get(wind_at + 1) {
            Some(direction) => (direction.to_string(), wind_at + 2),
            None => {
                return Err(LineDecodeError::InvalidField {
                    field: "wind_direction",
                    value: conditions.clone(),
                })
            }
        },
    };

    let wind_speed_mps = tokens
        .get(speed_at)
        .filter(|token| !token.starts_with(WAVE_LABEL))
        .and_then(|token| parse_int(token.trim_end_matches('m')));

    let (wave_at, wave_glued) =
        find_label(&tokens, WAVE_LABEL).ok_or(LineDecodeError::MissingMarker {
            role: LineRole::RaceHeader,
            marker: WAVE_LABEL,
        })?;
    let wave_text = match wave_glued {
        Some(height) => Some(height),
        None => tokens.get(wave_at + 1).copied(),
    };
    let wave_height_cm = wave_text.and_then(|text| parse_int(text.trim_end_matches("cm")));

    Ok(RaceHeaderFields {
        race_index,
        race_name,
        special_rule,
        distance_m,
        weather,
        wind_direction,
        wind_speed_mps,
        wave_height_cm,
    })
}

/// Race index of a header line on its own, so a header whose conditions do
/// not decode can still be reported by race.
pub fn decode_race_index(line: &str) -> Option<u8> {
    parse_race_index(&slice_cols(line, rc::RACE_INDEX))
}

fn parse_race_index(text: &str) -> Option<u8> {
    parse_int(text.trim_end().trim_end_matches(['R', 'Ｒ']))
}

/// Locate the token carrying `label` (`風`, `波`, `波高`). Returns its index and
/// any value glued onto the label itself.
fn find_label<'t>(tokens: &[&'t str], label: &str) -> Option<(usize, Option<&'t str>)> {
    tokens.iter().copied().enumerate().find_map(|(index, token)| {
        let rest = token.strip_prefix(label)?;
        let rest = rest.trim_start_matches('高');
        Some((index, (!rest.is_empty()).then_some(rest)))
    })
}

fn decode_decisive_factor(line: &str) -> Result<String, LineDecodeError> {
    let (_, tail) = line
        .split_once(TABLE_HEADER)
        .ok_or(LineDecodeError::MissingMarker {
            role: LineRole::DecisiveFactor,
            marker: "table header",
        })?;
    non_empty(strip_spaces(tail)).ok_or(LineDecodeError::InvalidField {
        field: "decisive_factor",
        value: tail.to_string(),
    })
}

fn decode_boat_row(columns: &Columns) -> Result<BoatRowFields, LineDecodeError> {
    columns.require_width(LineRole::BoatResult, rc::BOAT_ROW_MIN_WIDTH)?;

    Ok(BoatRowFields {
        arrival_order: parse_arrival(&columns.slice(rc::ARRIVAL)),
        boat_number: required(columns, rc::BOAT_NUMBER, "boat_number")?,
        registration: required(columns, rc::REGISTRATION, "registration")?,
        player_name: strip_spaces(&columns.slice(rc::PLAYER_NAME)),
        motor_number: required(columns, rc::MOTOR_NUMBER, "motor_number")?,
        boat_equipment_number: required(columns, rc::BOAT_EQUIPMENT_NUMBER, "boat_number")?,
        exhibition_time: parse_decimal(&columns.slice(rc::EXHIBITION_TIME)),
        starting_order: parse_int(&columns.slice(rc::STARTING_ORDER)),
        start_timing: parse_decimal(&columns.slice(rc::START_TIMING)),
        race_time: parse_race_time(&columns.slice(rc::RACE_TIME)),
    })
}

/// Refund rows are read as whitespace tokens: the label (blank on a
/// continuation row), then `combination amount` pairs up to the popularity
/// column. Full-width labels shift the half-width columns after them, so
/// fixed ranges do not line up across bet types.
fn decode_refund(line: &str) -> Result<RefundLine, LineDecodeError> {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&first) = tokens.first() else {
        return Err(LineDecodeError::TooShort {
            role: LineRole::Refund,
            expected: 1,
            found: 0,
        });
    };

    let bet_type = match BetType::strip_label(first) {
        Some((bet, rest)) => {
            if rest.is_empty() {
                tokens.remove(0);
            } else {
                tokens[0] = rest;
            }
            Some(bet)
        }
        None if starts_with_digit(first) => None,
        None => {
            return Err(LineDecodeError::InvalidField {
                field: "refund_label",
                value: first.to_string(),
            });
        }
    };

    let fields = tokens
        .split(|token| *token == POPULARITY_LABEL)
        .next()
        .unwrap_or_default();
    let winners = if bet_type == Some(BetType::Place) { 2 } else { 1 };
    let payouts: Vec<Payout> = fields
        .chunks(2)
        .take(winners)
        .map(|pair| Payout {
            combination: pair[0].to_string(),
            amount: pair.get(1).and_then(|amount| parse_amount(amount)),
        })
        .collect();

    if payouts.is_empty() {
        return Err(LineDecodeError::InvalidField {
            field: "refund_combination",
            value: trim(line),
        });
    }
    Ok(RefundLine { bet_type, payouts })
}

fn starts_with_digit(token: &str) -> bool {
    normalize_digits(token)
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
}

// =============================================================================
// Column access
// =============================================================================

/// A line split into characters so ranges address columns, not bytes.
#[derive(Debug)]
struct Columns {
    chars: Vec<char>,
}

impl Columns {
    fn new(line: &str) -> Self {
        Self {
            chars: line.chars().collect(),
        }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    /// Characters in `range`, clamped to the line end.
    fn slice(&self, range: Range<usize>) -> String {
        let end = range.end.min(self.chars.len());
        let start = range.start.min(end);
        self.chars[start..end].iter().collect()
    }

    fn require_width(&self, role: LineRole, expected: usize) -> Result<(), LineDecodeError> {
        if self.chars.len() < expected {
            return Err(LineDecodeError::TooShort {
                role,
                expected,
                found: self.chars.len(),
            });
        }
        Ok(())
    }

    /// Column of the `H` that opens a distance token such as `H1800m`.
    fn find_distance_marker(&self, from: usize) -> Option<usize> {
        (from..self.chars.len().saturating_sub(1)).find(|&index| {
            self.chars[index] == DISTANCE_MARKER && self.chars[index + 1].is_ascii_digit()
        })
    }
}

/// Characters of `line` in `range`, clamped to the line end.
pub fn slice_cols(line: &str, range: Range<usize>) -> String {
    Columns::new(line).slice(range)
}

fn required<T: FromStr>(
    columns: &Columns,
    range: Range<usize>,
    field: &'static str,
) -> Result<T, LineDecodeError> {
    let text = columns.slice(range);
    parse_int(&text).ok_or(LineDecodeError::InvalidField { field, value: text })
}

// =============================================================================
// Field parsers
// =============================================================================

/// Map full-width digits and punctuation onto their ASCII forms.
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            '．' => '.',
            '－' => '-',
            other => other,
        })
        .collect()
}

fn trim(text: &str) -> String {
    text.trim().to_string()
}

/// Remove every space, including the full-width padding inside names.
fn strip_spaces(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

/// Trim (half- and full-width) whitespace and parse an integer.
pub fn parse_int<T: FromStr>(text: &str) -> Option<T> {
    let normalized = normalize_digits(text);
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}

pub fn parse_decimal(text: &str) -> Option<f32> {
    let normalized = normalize_digits(text);
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f32>().ok().filter(|value| value.is_finite())
}

/// Payout amount in yen; thousands separators are tolerated.
fn parse_amount(text: &str) -> Option<i64> {
    parse_int(&text.replace(',', ""))
}

/// Arrival column: blank is `None`, a place 1-6 is kept, anything else
/// (disqualification, capsize, flying start markers) is the
/// did-not-finish sentinel.
pub fn parse_arrival(text: &str) -> Option<u8> {
    let normalized = normalize_digits(text);
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<u8>() {
        Ok(place) if (1..=6).contains(&place) => Some(place),
        _ => Some(ARRIVAL_DID_NOT_FINISH),
    }
}

/// Race time printed as minutes, seconds and tenths (`1.49.7`). The digits
/// are read positionally: last digit tenths, two before it seconds, the rest
/// minutes.
pub fn parse_race_time(text: &str) -> Option<Duration> {
    let normalized = normalize_digits(text);
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return None;
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '\'' | '"' | ':' | '’' | '”'))
    {
        return None;
    }

    let digits: Vec<u32> = trimmed.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 3 {
        return None;
    }

    let split = digits.len() - 3;
    let minutes = digits[..split].iter().fold(0u64, |acc, d| acc * 10 + *d as u64);
    let seconds = (digits[split] * 10 + digits[split + 1]) as u64;
    let tenths = digits[split + 2] as u64;
    if seconds >= 60 {
        return None;
    }

    Some(Duration::from_millis(
        (minutes * 60 + seconds) * 1000 + tenths * 100,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race_header(index: u8, name: &str, rule: &str, conditions: &str) -> String {
        format!("{:>4}R       {:<8}{:<11}{}", index, name, rule, conditions)
    }

    #[test]
    fn test_parse_int_tolerates_spaces() {
        assert_eq!(parse_int::<u32>("  4320 "), Some(4320));
        assert_eq!(parse_int::<u32>("\u{3000}12\u{3000}"), Some(12));
        assert_eq!(parse_int::<u32>("１２"), Some(12));
        assert_eq!(parse_int::<u32>("1x"), None);
        assert_eq!(parse_int::<u32>("   "), None);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal(" 6.78"), Some(6.78));
        assert_eq!(parse_decimal("  ."), None);
        assert_eq!(parse_decimal("F.01"), None);
    }

    #[test]
    fn test_parse_arrival() {
        assert_eq!(parse_arrival("01"), Some(1));
        assert_eq!(parse_arrival(" 6"), Some(6));
        assert_eq!(parse_arrival("F "), Some(ARRIVAL_DID_NOT_FINISH));
        assert_eq!(parse_arrival("K0"), Some(ARRIVAL_DID_NOT_FINISH));
        assert_eq!(parse_arrival("転"), Some(ARRIVAL_DID_NOT_FINISH));
        assert_eq!(parse_arrival("  "), None);
    }

    #[test]
    fn test_parse_race_time() {
        assert_eq!(parse_race_time("   1.49.7"), Some(Duration::from_millis(109_700)));
        assert_eq!(parse_race_time("1'52\"3"), Some(Duration::from_millis(112_300)));
        assert_eq!(parse_race_time("1523"), Some(Duration::from_millis(112_300)));
        assert_eq!(parse_race_time(" .  . "), None);
        assert_eq!(parse_race_time("1.75.0"), None);
        assert_eq!(parse_race_time("abc"), None);
        assert_eq!(parse_race_time(""), None);
    }

    #[test]
    fn test_race_header_with_glued_wave_height() {
        let line = race_header(1, "予選", "特別規定なし", "H1800m  晴 風 北 2m 波高3cm");
        let fields = match decode(LineRole::RaceHeader, &line).unwrap() {
            PartialRecord::RaceHeader(fields) => fields,
            other => panic!("Expected race header, got {:?}", other),
        };

        assert_eq!(fields.race_index, 1);
        assert_eq!(fields.race_name, "予選");
        assert_eq!(fields.special_rule, None);
        assert_eq!(fields.distance_m, Some(1800));
        assert_eq!(fields.weather, "晴");
        assert_eq!(fields.wind_direction, "北");
        assert_eq!(fields.wind_speed_mps, Some(2));
        assert_eq!(fields.wave_height_cm, Some(3));
    }

    #[test]
    fn test_race_header_dump_spacing() {
        let line = race_header(
            12,
            "優勝戦",
            "進入固定",
            "H1800m  曇り　  風  北西　　 5m  波　  4cm",
        );
        let fields = match decode(LineRole::RaceHeader, &line).unwrap() {
            PartialRecord::RaceHeader(fields) => fields,
            other => panic!("Expected race header, got {:?}", other),
        };

        assert_eq!(fields.race_index, 12);
        assert_eq!(fields.race_name, "優勝戦");
        assert_eq!(fields.special_rule.as_deref(), Some("進入固定"));
        assert_eq!(fields.weather, "曇り");
        assert_eq!(fields.wind_direction, "北西");
        assert_eq!(fields.wind_speed_mps, Some(5));
        assert_eq!(fields.wave_height_cm, Some(4));
    }

    #[test]
    fn test_race_header_long_special_rule_shifts_marker() {
        let line = race_header(
            3,
            "一般戦",
            "安定板使用・周回短縮あり",
            "H1200m  雨 風 南 7m 波 10cm",
        );
        let fields = match decode(LineRole::RaceHeader, &line).unwrap() {
            PartialRecord::RaceHeader(fields) => fields,
            other => panic!("Expected race header, got {:?}", other),
        };
        assert_eq!(fields.special_rule.as_deref(), Some("安定板使用・周回短縮あり"));
        assert_eq!(fields.distance_m, Some(1200));
        assert_eq!(fields.wave_height_cm, Some(10));
    }

    #[test]
    fn test_race_header_bad_wind_speed_is_field_level() {
        let line = race_header(2, "予選", "", "H1800m  晴 風 北 ?m 波 3cm");
        match decode(LineRole::RaceHeader, &line).unwrap() {
            PartialRecord::RaceHeader(fields) => {
                assert_eq!(fields.wind_speed_mps, None);
                assert_eq!(fields.wave_height_cm, Some(3));
            }
            other => panic!("Expected race header, got {:?}", other),
        }
    }

    #[test]
    fn test_race_header_without_marker_is_line_error() {
        let line = race_header(4, "予選", "", "1800m 晴 風 北 2m 波 3cm");
        assert_eq!(
            decode(LineRole::RaceHeader, &line).unwrap_err(),
            LineDecodeError::MissingMarker {
                role: LineRole::RaceHeader,
                marker: "H",
            }
        );
    }

    #[test]
    fn test_race_header_too_short() {
        assert!(matches!(
            decode(LineRole::RaceHeader, "   1R").unwrap_err(),
            LineDecodeError::TooShort { .. }
        ));
    }

    #[test]
    fn test_decisive_factor() {
        let line = format!("{} 逃げ　　", TABLE_HEADER);
        assert_eq!(
            decode(LineRole::DecisiveFactor, &line).unwrap(),
            PartialRecord::DecisiveFactor("逃げ".to_string())
        );
        assert!(decode(LineRole::DecisiveFactor, TABLE_HEADER).is_err());
    }

    #[test]
    fn test_stadium_name_strips_padding() {
        assert_eq!(
            decode(LineRole::StadiumName, "徳　山［成績］      9/ 1").unwrap(),
            PartialRecord::StadiumName("徳山".to_string())
        );
        assert_eq!(
            decode(LineRole::StadiumName, "江戸川［成績］").unwrap(),
            PartialRecord::StadiumName("江戸川".to_string())
        );
    }

    #[test]
    fn test_boat_row() {
        let line = format!(
            "  {:>2}  {} {} {:<8}{:>4}{:>5}{:>6}{:>4}{:>8}{:>9}",
            "01", 3, 4320, "峰　　竜　太", 12, 34, "6.78", 3, "0.12", "1.49.7"
        );
        let fields = match decode(LineRole::BoatResult, &line).unwrap() {
            PartialRecord::BoatRow(fields) => fields,
            other => panic!("Expected boat row, got {:?}", other),
        };

        assert_eq!(fields.arrival_order, Some(1));
        assert_eq!(fields.boat_number, 3);
        assert_eq!(fields.registration, 4320);
        assert_eq!(fields.player_name, "峰竜太");
        assert_eq!(fields.motor_number, 12);
        assert_eq!(fields.boat_equipment_number, 34);
        assert_eq!(fields.exhibition_time, Some(6.78));
        assert_eq!(fields.starting_order, Some(3));
        assert_eq!(fields.start_timing, Some(0.12));
        assert_eq!(fields.race_time, Some(Duration::from_millis(109_700)));
    }

    #[test]
    fn test_boat_row_corrupt_optional_field_is_none() {
        let line = format!(
            "  {:>2}  {} {} {:<8}{:>4}{:>5}{:>6}{:>4}{:>8}{:>9}",
            "02", 5, 4444, "山田太郎", 41, 20, "6.x9", 5, "0.20", "1.51.2"
        );
        match decode(LineRole::BoatResult, &line).unwrap() {
            PartialRecord::BoatRow(fields) => {
                assert_eq!(fields.exhibition_time, None);
                assert_eq!(fields.start_timing, Some(0.2));
                assert_eq!(fields.race_time, Some(Duration::from_millis(111_200)));
            }
            other => panic!("Expected boat row, got {:?}", other),
        }
    }

    #[test]
    fn test_boat_row_missing_required_field() {
        let line = format!(
            "  {:>2}  {} {} {:<8}{:>4}{:>5}",
            "03", 2, "43x0", "山田太郎", 41, 20
        );
        assert_eq!(
            decode(LineRole::BoatResult, &line).unwrap_err(),
            LineDecodeError::InvalidField {
                field: "registration",
                value: "43x0".to_string(),
            }
        );
    }

    #[test]
    fn test_race_index_survives_bad_conditions() {
        let line = race_header(11, "準優勝戦", "", "H1800m  晴　  北　　 2m  波　  3cm");
        assert!(matches!(
            decode(LineRole::RaceHeader, &line).unwrap_err(),
            LineDecodeError::MissingMarker {
                marker: WIND_LABEL,
                ..
            }
        ));
        assert_eq!(decode_race_index(&line), Some(11));
        assert_eq!(decode_race_index("  12Ｒ"), Some(12));
        assert_eq!(decode_race_index("徳　山［成績］"), None);
    }

    #[test]
    fn test_boat_row_too_short() {
        assert!(matches!(
            decode(LineRole::BoatResult, "  01  1 4320").unwrap_err(),
            LineDecodeError::TooShort {
                role: LineRole::BoatResult,
                ..
            }
        ));
    }

    fn refund(line: &str) -> RefundLine {
        match decode(LineRole::Refund, line).unwrap() {
            PartialRecord::Refund(refund) => refund,
            other => panic!("Expected refund, got {:?}", other),
        }
    }

    #[test]
    fn test_refund_lines() {
        assert_eq!(
            refund("        単勝     1          140"),
            RefundLine {
                bet_type: Some(BetType::Win),
                payouts: vec![Payout {
                    combination: "1".to_string(),
                    amount: Some(140),
                }],
            }
        );

        let place = refund("        複勝     1          100  2          110");
        assert_eq!(place.bet_type, Some(BetType::Place));
        assert_eq!(place.payouts.len(), 2);
        assert_eq!(place.payouts[0].amount, Some(100));
        assert_eq!(place.payouts[1].combination, "2");
        assert_eq!(place.payouts[1].amount, Some(110));

        let exacta = refund("        ２連単   1-2        370  人気     1");
        assert_eq!(exacta.bet_type, Some(BetType::Exacta));
        assert_eq!(
            exacta.payouts,
            vec![Payout {
                combination: "1-2".to_string(),
                amount: Some(370),
            }]
        );

        let trifecta = refund("        ３連単   1-2-3     1020  人気     2");
        assert_eq!(trifecta.bet_type, Some(BetType::Trifecta));
        assert_eq!(trifecta.payouts[0].combination, "1-2-3");
        assert_eq!(trifecta.payouts[0].amount, Some(1020));
    }

    #[test]
    fn test_refund_single_place_winner() {
        let place = refund("        複勝     1          100");
        assert_eq!(place.bet_type, Some(BetType::Place));
        assert_eq!(place.payouts.len(), 1);
    }

    #[test]
    fn test_refund_label_without_gap() {
        let line = refund("        ２連複1-2        250  人気     1");
        assert_eq!(line.bet_type, Some(BetType::Quinella));
        assert_eq!(line.payouts[0].combination, "1-2");
        assert_eq!(line.payouts[0].amount, Some(250));
    }

    #[test]
    fn test_refund_special_payout_amount() {
        let line = refund("        単勝     1       特払い");
        assert_eq!(line.bet_type, Some(BetType::Win));
        assert_eq!(line.payouts[0].amount, None);

        let separated = refund("        ３連単   1-2-3    12,340  人気    48");
        assert_eq!(separated.payouts[0].amount, Some(12340));
    }

    #[test]
    fn test_refund_continuation_and_unknown_label() {
        let continuation = refund("                 1-3        200  人気     3");
        assert_eq!(continuation.bet_type, None);
        assert_eq!(continuation.payouts.len(), 1);
        assert_eq!(continuation.payouts[0].combination, "1-3");
        assert_eq!(continuation.payouts[0].amount, Some(200));

        match decode(LineRole::Refund, "        返還     4            0").unwrap_err() {
            LineDecodeError::InvalidField { field, value } => {
                assert_eq!(field, "refund_label");
                assert_eq!(value, "返還");
            }
            other => panic!("Expected InvalidField, got {:?}", other),
        }

        assert!(matches!(
            decode(LineRole::Refund, "        単勝").unwrap_err(),
            LineDecodeError::InvalidField {
                field: "refund_combination",
                ..
            }
        ));
    }

    #[test]
    fn test_parameter_row() {
        let fields =
            decode_parameter_row("1 4320峰　竜太36佐賀52A1 5.25 38.10 6.02 45.00 12 38.51 34 33.10")
                .unwrap();

        assert_eq!(fields.boat_number, 1);
        assert_eq!(fields.registration, 4320);
        assert_eq!(fields.player_name, "峰竜太");
        assert_eq!(fields.age, Some(36));
        assert_eq!(fields.branch.as_deref(), Some("佐賀"));
        assert_eq!(fields.weight, Some(52));
        assert_eq!(fields.rank.as_deref(), Some("A1"));
        assert_eq!(fields.national_win_rate, Some(5.25));
        assert_eq!(fields.national_top2_rate, Some(38.10));
        assert_eq!(fields.local_win_rate, Some(6.02));
        assert_eq!(fields.local_top2_rate, Some(45.00));
        assert_eq!(fields.motor_number, Some(12));
        assert_eq!(fields.motor_top2_rate, Some(38.51));
        assert_eq!(fields.boat_equipment_number, Some(34));
        assert_eq!(fields.boat_top2_rate, Some(33.10));
    }

    #[test]
    fn test_parameter_row_truncated_rates_are_none() {
        let fields = decode_parameter_row("2 4444山田太郎29東京53B1 4.10").unwrap();
        assert_eq!(fields.national_win_rate, Some(4.10));
        assert_eq!(fields.national_top2_rate, None);
        assert_eq!(fields.motor_number, None);
        assert_eq!(fields.boat_top2_rate, None);
    }

    #[test]
    fn test_non_field_roles_are_not_decodable() {
        assert_eq!(
            decode(LineRole::Blank, "").unwrap_err(),
            LineDecodeError::NotDecodable {
                role: LineRole::Blank
            }
        );
    }

    #[test]
    fn test_slice_cols_counts_characters() {
        assert_eq!(slice_cols("徳　山［成績］", 0..3), "徳　山");
        assert_eq!(slice_cols("abc", 2..10), "c");
        assert_eq!(slice_cols("abc", 5..10), "");
    }
}
