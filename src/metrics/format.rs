//! Display formatting for dashboard values.
//!
//! Absent inputs render a fixed placeholder so a half-loaded view never fails.

use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};

pub const CURRENCY_PLACEHOLDER: &str = "-";
pub const QUANTITY_PLACEHOLDER: &str = "0.000000";
pub const TIMESTAMP_PLACEHOLDER: &str = "-";

fn group_thousands(integer: &str) -> String {
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn money(value: Decimal, decimals: u32) -> String {
    let rounded = value
        .abs()
        .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let fixed = format!("{:.*}", decimals as usize, rounded);
    let (integer, fraction) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (fixed, None),
    };

    let sign = if value.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    match fraction {
        Some(f) => format!("{}${}.{}", sign, group_thousands(&integer), f),
        None => format!("{}${}", sign, group_thousands(&integer)),
    }
}

/// `$1,234.56`, `-$1,234.56`, or `-` when absent.
pub fn format_currency(value: Option<Decimal>) -> String {
    value.map_or_else(|| CURRENCY_PLACEHOLDER.to_string(), |v| money(v, 2))
}

/// Whole-dollar variant for summary cards.
pub fn format_currency_whole(value: Option<Decimal>) -> String {
    value.map_or_else(|| CURRENCY_PLACEHOLDER.to_string(), |v| money(v, 0))
}

pub fn format_quantity(value: Option<Decimal>) -> String {
    match value {
        Some(v) => {
            let rounded = v.round_dp_with_strategy(6, RoundingStrategy::MidpointAwayFromZero);
            format!("{:.6}", rounded)
        }
        None => QUANTITY_PLACEHOLDER.to_string(),
    }
}

pub fn format_percent(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("{:.2}%", rounded)
    } else {
        format!("+{:.2}%", rounded.abs())
    }
}

pub fn format_timestamp(value: Option<NaiveDateTime>) -> String {
    value.map_or_else(
        || TIMESTAMP_PLACEHOLDER.to_string(),
        |ts| ts.format("%b %-d, %Y %H:%M").to_string(),
    )
}
