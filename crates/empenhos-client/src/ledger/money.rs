use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Parses a Brazilian-formatted amount (`1.234.567,89`).
///
/// Every `.` is dropped and `,` becomes the decimal point. Anything that
/// still fails to parse is zero.
pub fn parse_brl(raw: &str) -> Decimal {
    let cleaned = raw.trim().replace('.', "").replace(',', ".");
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(&cleaned).unwrap_or(Decimal::ZERO)
}

pub fn decimal_from_f64(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::try_from(value)
        .map(|decimal| decimal.normalize())
        .unwrap_or(Decimal::ZERO)
}

/// `R$ 1.234.567,89`, rounded half away from zero to cents.
pub fn format_brl(value: Decimal) -> String {
    format!("R$ {}", group_thousands(value))
}

/// Plain decimal-comma rendering used by CSV export: no grouping and no
/// rounding, so the value parses back to the same `Decimal`.
pub fn format_decimal_comma(value: Decimal) -> String {
    value.normalize().to_string().replace('.', ",")
}

pub fn format_percent(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}%", rounded).replace('.', ",")
}

fn group_thousands(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let fixed = format!("{:.2}", rounded.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits = integer.chars().collect::<Vec<char>>();
    let mut grouped = String::new();
    for (index, digit) in digits.iter().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped},{fraction}")
}
