use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::time::{date, datetime, option_datetime};

/// One day of account value as recorded by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    #[serde(with = "date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub cash_balance: Decimal,
    #[serde(default)]
    pub holdings_value: Decimal,
    /// Reported total. Not trusted; see [`BalanceSnapshot::total`].
    #[serde(default)]
    pub total_portfolio_value: Decimal,
}

impl BalanceSnapshot {
    pub fn total(&self) -> Decimal {
        self.cash_balance + self.holdings_value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(with = "datetime")]
    pub timestamp: NaiveDateTime,
    pub action: TradeAction,
    pub symbol: String,
    pub quantity: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub profit_loss: Option<Decimal>,
}

impl Trade {
    pub fn total_value(&self) -> Decimal {
        self.quantity * self.price
    }

    pub fn display_symbol(&self) -> String {
        self.symbol.to_uppercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub current_price: Decimal,
    /// Reported value. Not trusted; see [`Holding::value`].
    #[serde(default)]
    pub current_value: Decimal,
    #[serde(rename = "created_at", default, with = "option_datetime")]
    pub acquired_at: Option<NaiveDateTime>,
    #[serde(default, with = "option_datetime")]
    pub updated_at: Option<NaiveDateTime>,
}

impl Holding {
    pub fn value(&self) -> Decimal {
        self.quantity * self.current_price
    }
}

/// Gateway-side portfolio summary. On failure the gateway only fills `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PortfolioSummary {
    #[serde(default)]
    pub cash_balance: Decimal,
    #[serde(default)]
    pub holdings_value: Decimal,
    #[serde(default)]
    pub total_portfolio_value: Decimal,
    #[serde(default)]
    pub holdings_count: usize,
    #[serde(default)]
    pub holdings: Vec<Holding>,
    #[serde(default, with = "option_datetime")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AccountBalance {
    #[serde(default)]
    pub balance: Decimal,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_total_is_recomputed() {
        let json = r#"{
            "date": "2024-01-15",
            "cash_balance": 1000.50,
            "holdings_value": 54899.5,
            "total_portfolio_value": 1.0
        }"#;
        let snap: BalanceSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.total(), dec!(55900));
        assert_eq!(snap.total_portfolio_value, dec!(1.0));
    }

    #[test]
    fn test_trade_with_null_profit_loss() {
        let json = r#"{
            "timestamp": "2024-01-15T10:30:00",
            "action": "BUY",
            "symbol": "bitcoin",
            "quantity": 0.015,
            "price": 42000,
            "profit_loss": null
        }"#;
        let trade: Trade = serde_json::from_str(json).unwrap();
        assert_eq!(trade.action, TradeAction::Buy);
        assert_eq!(trade.profit_loss, None);
        assert_eq!(trade.total_value(), dec!(630));
        assert_eq!(trade.display_symbol(), "BITCOIN");
    }

    #[test]
    fn test_holding_value_ignores_reported_value() {
        let json = r#"{
            "symbol": "ethereum",
            "quantity": 2,
            "created_at": "2024-01-01T00:00:00",
            "current_price": 2500.25,
            "current_value": 0
        }"#;
        let holding: Holding = serde_json::from_str(json).unwrap();
        assert_eq!(holding.value(), dec!(5000.50));
        assert!(holding.acquired_at.is_some());
        assert!(holding.updated_at.is_none());
    }

    #[test]
    fn test_summary_error_shape() {
        let summary: PortfolioSummary =
            serde_json::from_str(r#"{"error":"Authentication required"}"#).unwrap();
        assert_eq!(summary.error.as_deref(), Some("Authentication required"));
        assert!(summary.holdings.is_empty());
        assert_eq!(summary.total_portfolio_value, Decimal::ZERO);
    }
}
