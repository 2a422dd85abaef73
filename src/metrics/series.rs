use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::BalanceSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPoint {
    pub date: NaiveDate,
    pub total_value: Decimal,
    pub cash_value: Decimal,
    pub holdings_value: Decimal,
}

impl From<&BalanceSnapshot> for PortfolioPoint {
    fn from(snapshot: &BalanceSnapshot) -> Self {
        Self {
            date: snapshot.date,
            total_value: snapshot.total(),
            cash_value: snapshot.cash_balance,
            holdings_value: snapshot.holdings_value,
        }
    }
}

/// Absolute and relative movement between two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Change {
    pub absolute: Decimal,
    pub percent: Decimal,
}

impl Change {
    pub fn between(baseline: Decimal, latest: Decimal) -> Self {
        Self {
            absolute: latest - baseline,
            percent: percent_change(baseline, latest),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PerformanceSummary {
    pub current_value: Decimal,
    pub period_change: Change,
    pub total_return: Change,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub points: usize,
}

/// Chronological (oldest-first) series from gateway balance history.
///
/// The gateway sends newest-first, so the history is reversed and then
/// stably sorted by date; inputs in any order come out chronological.
pub fn performance_series(history: &[BalanceSnapshot]) -> Vec<PortfolioPoint> {
    let mut points: Vec<PortfolioPoint> = history.iter().rev().map(PortfolioPoint::from).collect();
    points.sort_by_key(|p| p.date);
    points
}

/// `(latest - baseline) / baseline * 100`, or zero when the baseline is zero.
pub fn percent_change(baseline: Decimal, latest: Decimal) -> Decimal {
    if baseline.is_zero() {
        return Decimal::ZERO;
    }
    (latest - baseline) / baseline * dec!(100)
}

/// Change from the earliest point to the latest.
pub fn total_return(series: &[PortfolioPoint]) -> Change {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) => Change::between(first.total_value, last.total_value),
        _ => Change::default(),
    }
}

/// Change between the two most recent points; zero with fewer than two.
pub fn period_change(series: &[PortfolioPoint]) -> Change {
    match series {
        [.., previous, current] => Change::between(previous.total_value, current.total_value),
        _ => Change::default(),
    }
}

pub fn summarize(series: &[PortfolioPoint]) -> PerformanceSummary {
    PerformanceSummary {
        current_value: series.last().map(|p| p.total_value).unwrap_or(Decimal::ZERO),
        period_change: period_change(series),
        total_return: total_return(series),
        start_date: series.first().map(|p| p.date),
        end_date: series.last().map(|p| p.date),
        points: series.len(),
    }
}
