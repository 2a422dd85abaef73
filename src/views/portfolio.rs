use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::{ViewKind, ViewSource};
use crate::error::DashboardResult;
use crate::gateway::AccountGateway;
use crate::metrics::{performance_series, summarize, trade_stats, PerformanceSummary, PortfolioPoint, TradeStats};
use crate::types::{BalanceSnapshot, Trade};

/// Performance chart data plus the summary cards shown above it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioView {
    pub series: Vec<PortfolioPoint>,
    pub summary: PerformanceSummary,
    pub trade_stats: TradeStats,
}

impl PortfolioView {
    pub fn derive(history: &[BalanceSnapshot], trades: &[Trade]) -> Self {
        let series = performance_series(history);
        let summary = summarize(&series);
        Self {
            series,
            summary,
            trade_stats: trade_stats(trades),
        }
    }
}

pub struct PortfolioSource {
    gateway: Arc<dyn AccountGateway>,
}

impl PortfolioSource {
    pub fn new(gateway: Arc<dyn AccountGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ViewSource for PortfolioSource {
    type Data = PortfolioView;

    fn kind(&self) -> ViewKind {
        ViewKind::Portfolio
    }

    async fn load(&self) -> DashboardResult<PortfolioView> {
        // Both halves or nothing.
        let (history, trades) =
            tokio::try_join!(self.gateway.balance_history(), self.gateway.trades())?;
        Ok(PortfolioView::derive(&history, &trades))
    }
}
