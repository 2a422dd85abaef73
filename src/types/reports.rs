use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::time::option_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradingMode {
    #[default]
    Trading,
    Training,
}

impl TradingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingMode::Trading => "TRADING",
            TradingMode::Training => "TRAINING",
        }
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TradingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRADING" => Ok(TradingMode::Trading),
            "TRAINING" => Ok(TradingMode::Training),
            other => Err(format!("unknown trading mode: {}", other)),
        }
    }
}

/// Outcome of a single order placed during a run or backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TradeOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub total_value: Option<Decimal>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SymbolAnalysis {
    #[serde(rename = "coinId")]
    pub symbol: String,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default, rename = "shortTermSMA")]
    pub short_term_sma: Option<Decimal>,
    #[serde(default, rename = "longTermSMA")]
    pub long_term_sma: Option<Decimal>,
    #[serde(default)]
    pub signal: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub trade_result: Option<TradeOutcome>,
}

/// Report returned by `run` and `historical-training`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisReport {
    #[serde(default)]
    pub analyses: Vec<SymbolAnalysis>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub success: bool,
}

impl AnalysisReport {
    pub fn executed_trades(&self) -> impl Iterator<Item = &TradeOutcome> {
        self.analyses
            .iter()
            .filter_map(|a| a.trade_result.as_ref())
            .filter(|t| t.success)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BacktestReport {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "coinId", default)]
    pub symbol: String,
    #[serde(default, with = "option_datetime")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(default, with = "option_datetime")]
    pub end_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub initial_balance: Decimal,
    #[serde(default)]
    pub final_balance: Decimal,
    #[serde(default)]
    pub total_return: Decimal,
    #[serde(default)]
    pub total_return_percentage: Decimal,
    #[serde(default)]
    pub total_trades: u32,
    #[serde(default)]
    pub successful_trades: u32,
    #[serde(default)]
    pub trades: Vec<TradeOutcome>,
    #[serde(default)]
    pub summary: String,
}

impl BacktestReport {
    pub fn win_rate(&self) -> Decimal {
        if self.total_trades == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(self.successful_trades) / Decimal::from(self.total_trades) * dec!(100)
        }
    }
}
