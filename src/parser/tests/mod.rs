//! Scenario tests for whole result and parameter blocks.
//!
//! The helpers print lines in the same fixed-column layout the dumps use.


use crate::constants::TABLE_HEADER;

pub const CONDITIONS: &str = "H1800m  晴　  風  北　　 2m  波　  3cm";
pub const SEPARATOR: &str =
    "-------------------------------------------------------------------------------";

pub fn race_header(index: u8, name: &str, rule: &str, conditions: &str) -> String {
    format!("{:>4}R       {:<8}{:<11}{}", index, name, rule, conditions)
}

pub fn table_header(decisive_factor: &str) -> String {
    format!("{} {}", TABLE_HEADER, decisive_factor)
}

pub fn boat_row(arrival: &str, boat: u8, registration: &str, exhibition: &str) -> String {
    format!(
        "  {:>2}  {} {} {:<8}{:>4}{:>5}{:>6}{:>4}{:>8}{:>9}",
        arrival,
        boat,
        registration,
        format!("選手{}", boat),
        10 + boat as u32,
        30 + boat as u32,
        exhibition,
        boat,
        format!("0.1{}", boat),
        format!("1.5{}.0", boat)
    )
}

/// Bet label padded to nine display columns; full-width characters take two.
fn label_column(label: &str) -> String {
    let width: usize = label
        .chars()
        .map(|c| if c.is_ascii() { 1 } else { 2 })
        .sum();
    format!("{}{}", label, " ".repeat(9usize.saturating_sub(width)))
}

fn payout(combination: &str, amount: &str) -> String {
    format!("{:<7}{:>7}", combination, amount)
}

/// A payout row with its popularity column; a blank label prints a
/// continuation row.
pub fn refund_row(label: &str, combination: &str, amount: &str, popularity: u8) -> String {
    format!(
        "        {}{}  人気 {:>5}",
        label_column(label),
        payout(combination, amount),
        popularity
    )
}

pub fn win_row(combination: &str, amount: &str) -> String {
    format!("        {}{}", label_column("単勝"), payout(combination, amount))
}

/// Place row; a blank `second` prints a single winner.
pub fn place_row(first: &str, first_amount: &str, second: &str, second_amount: &str) -> String {
    let row = format!("        {}{}", label_column("複勝"), payout(first, first_amount));
    if second.is_empty() {
        row
    } else {
        format!("{}  {}", row, payout(second, second_amount))
    }
}

/// Boats 1-6 finishing in boat order.
pub fn standard_boats() -> Vec<String> {
    (1..=6u8)
        .map(|boat| {
            boat_row(
                &format!("0{}", boat),
                boat,
                &(4000 + boat as u32).to_string(),
                "6.80",
            )
        })
        .collect()
}

/// Every payout category for a 1-2-3 finish.
pub fn standard_refunds() -> Vec<String> {
    vec![
        win_row("1", "140"),
        place_row("1", "100", "2", "110"),
        refund_row("２連単", "1-2", "370", 1),
        refund_row("２連複", "1-2", "250", 1),
        refund_row("拡連複", "1-2", "150", 1),
        refund_row("", "1-3", "200", 3),
        refund_row("", "2-3", "300", 5),
        refund_row("３連単", "1-2-3", "1020", 2),
        refund_row("３連複", "1-2-3", "260", 1),
    ]
}

/// One race: header, table header, separator, boat rows, blank, payouts, blank.
pub fn race(header: &str, decisive_factor: &str, boats: &[String], refunds: &[String]) -> String {
    format!(
        "{}\n{}\n{}\n{}\n\n{}\n\n",
        header,
        table_header(decisive_factor),
        SEPARATOR,
        boats.join("\n"),
        refunds.join("\n")
    )
}

/// A standard race numbered `index`.
pub fn standard_race(index: u8) -> String {
    race(
        &race_header(index, "予選", "", CONDITIONS),
        "逃げ",
        &standard_boats(),
        &standard_refunds(),
    )
}

pub fn result_block(code: u8, stadium_line: &str, races: &[String]) -> String {
    format!(
        "{code:02}KBGN\n{stadium_line}\n\n  第 1日          2023/ 9/ 1\n\n{}{code:02}KEND\n",
        races.concat()
    )
}

/// A parameter row for a player with rates that are all set.
pub fn parameter_row(boat: u8, registration: u32, motor: u32, equipment: u32) -> String {
    format!(
        "{} {}山田太郎40東京54B1 4.80 30.00 5.10 33.00{:>3} 35.00{:>3} 31.00",
        boat, registration, motor, equipment
    )
}

pub fn race_group(index: &str, rows: &[String]) -> String {
    format!(
        "　{}Ｒ  予選            Ｈ１８００ｍ\n\
         -------------------------------------------\n\
         艇 選手 選手  年 支 体級    全国\n\
         番 登番  名   齢 部 重別 勝率  2率\n\
         -------------------------------------------\n\
         {}\n",
        index,
        rows.join("\n")
    )
}

pub fn parameter_block(code: u8, stadium: &str, groups: &[String]) -> String {
    format!(
        "{code:02}BBGN\nボートレース{stadium}   ９月　１日\n\n{}{code:02}BEND\n",
        groups.concat()
    )
}
