use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::types::{Trade, TradeAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TradeFilter {
    #[default]
    All,
    Buy,
    Sell,
    Profit,
    Loss,
}

impl TradeFilter {
    pub fn matches(&self, trade: &Trade) -> bool {
        match self {
            TradeFilter::All => true,
            TradeFilter::Buy => trade.action == TradeAction::Buy,
            TradeFilter::Sell => trade.action == TradeAction::Sell,
            TradeFilter::Profit => trade.profit_loss.map_or(false, |pl| pl > Decimal::ZERO),
            TradeFilter::Loss => trade.profit_loss.map_or(false, |pl| pl < Decimal::ZERO),
        }
    }
}

impl FromStr for TradeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(TradeFilter::All),
            "buy" => Ok(TradeFilter::Buy),
            "sell" => Ok(TradeFilter::Sell),
            "profit" => Ok(TradeFilter::Profit),
            "loss" => Ok(TradeFilter::Loss),
            other => Err(format!("unknown trade filter: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Date,
    Action,
    Quantity,
    Price,
    ProfitLoss,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "date" | "timestamp" => Ok(SortField::Date),
            "action" => Ok(SortField::Action),
            "quantity" => Ok(SortField::Quantity),
            "price" => Ok(SortField::Price),
            "profit_loss" | "pnl" => Ok(SortField::ProfitLoss),
            other => Err(format!("unknown sort field: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction: {}", other)),
        }
    }
}

/// Filter plus ordering applied to a view's trade list on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TradeQuery {
    pub filter: TradeFilter,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl fmt::Display for TradeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} by {:?} {:?}", self.filter, self.sort, self.direction)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TradeStats {
    pub total: usize,
    pub buys: usize,
    pub sells: usize,
    pub winning: usize,
    pub losing: usize,
    pub realized_pnl: Decimal,
}

pub fn filter_trades(trades: &[Trade], filter: TradeFilter) -> Vec<Trade> {
    trades.iter().filter(|t| filter.matches(t)).cloned().collect()
}

fn compare(a: &Trade, b: &Trade, field: SortField) -> Ordering {
    match field {
        SortField::Date => a.timestamp.cmp(&b.timestamp),
        SortField::Action => a.action.cmp(&b.action),
        SortField::Quantity => a.quantity.cmp(&b.quantity),
        SortField::Price => a.price.cmp(&b.price),
        // Absent P&L sorts below any recorded value.
        SortField::ProfitLoss => a.profit_loss.cmp(&b.profit_loss),
    }
}

/// Stable sort: trades with equal keys keep their source order in both directions.
pub fn sort_trades(trades: &[Trade], field: SortField, direction: SortDirection) -> Vec<Trade> {
    let mut sorted = trades.to_vec();
    match direction {
        SortDirection::Asc => sorted.sort_by(|a, b| compare(a, b, field)),
        SortDirection::Desc => sorted.sort_by(|a, b| compare(b, a, field)),
    }
    sorted
}

pub fn apply_query(trades: &[Trade], query: &TradeQuery) -> Vec<Trade> {
    sort_trades(&filter_trades(trades, query.filter), query.sort, query.direction)
}

pub fn trade_stats(trades: &[Trade]) -> TradeStats {
    TradeStats {
        total: trades.len(),
        buys: trades.iter().filter(|t| t.action == TradeAction::Buy).count(),
        sells: trades.iter().filter(|t| t.action == TradeAction::Sell).count(),
        winning: trades.iter().filter(|t| TradeFilter::Profit.matches(t)).count(),
        losing: trades.iter().filter(|t| TradeFilter::Loss.matches(t)).count(),
        realized_pnl: trades.iter().filter_map(|t| t.profit_loss).sum(),
    }
}
