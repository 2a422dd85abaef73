use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Holding, PortfolioSummary};

/// A holding with its value recomputed from quantity and price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRow {
    pub symbol: String,
    pub quantity: Decimal,
    pub current_price: Decimal,
    pub current_value: Decimal,
    pub acquired_at: Option<NaiveDateTime>,
}

impl From<&Holding> for HoldingRow {
    fn from(holding: &Holding) -> Self {
        Self {
            symbol: holding.symbol.clone(),
            quantity: holding.quantity,
            current_price: holding.current_price,
            current_value: holding.value(),
            acquired_at: holding.acquired_at,
        }
    }
}

impl HoldingRow {
    pub fn display_symbol(&self) -> String {
        self.symbol.to_uppercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HoldingsSummary {
    pub cash_balance: Decimal,
    pub holdings_value: Decimal,
    pub total_portfolio_value: Decimal,
    pub holdings_count: usize,
}

pub fn holding_rows(holdings: &[Holding]) -> Vec<HoldingRow> {
    holdings.iter().map(HoldingRow::from).collect()
}

/// Summary built from the recomputed rows; only cash is taken from the gateway.
pub fn summarize_holdings(rows: &[HoldingRow], gateway: &PortfolioSummary) -> HoldingsSummary {
    let holdings_value: Decimal = rows.iter().map(|r| r.current_value).sum();
    HoldingsSummary {
        cash_balance: gateway.cash_balance,
        holdings_value,
        total_portfolio_value: gateway.cash_balance + holdings_value,
        holdings_count: rows.len(),
    }
}
