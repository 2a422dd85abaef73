use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::{ViewKind, ViewSource};
use crate::error::DashboardResult;
use crate::gateway::AccountGateway;
use crate::metrics::{apply_query, trade_stats, TradeQuery, TradeStats};
use crate::types::Trade;

/// Trade history as fetched. Filtering and sorting happen on read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradesView {
    pub trades: Vec<Trade>,
    pub stats: TradeStats,
}

impl TradesView {
    pub fn new(trades: Vec<Trade>) -> Self {
        let stats = trade_stats(&trades);
        Self { trades, stats }
    }

    pub fn query(&self, query: &TradeQuery) -> Vec<Trade> {
        apply_query(&self.trades, query)
    }
}

pub struct TradesSource {
    gateway: Arc<dyn AccountGateway>,
}

impl TradesSource {
    pub fn new(gateway: Arc<dyn AccountGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ViewSource for TradesSource {
    type Data = TradesView;

    fn kind(&self) -> ViewKind {
        ViewKind::Trades
    }

    async fn load(&self) -> DashboardResult<TradesView> {
        Ok(TradesView::new(self.gateway.trades().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockAccountGateway;
    use crate::metrics::{SortDirection, SortField, TradeFilter};
    use crate::types::TradeAction;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn trades() -> Vec<Trade> {
        let at = |h| NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(h, 0, 0).unwrap();
        vec![
            Trade {
                timestamp: at(12),
                action: TradeAction::Sell,
                symbol: "bitcoin".to_string(),
                quantity: dec!(0.1),
                price: dec!(43000),
                profit_loss: Some(dec!(-125.75)),
            },
            Trade {
                timestamp: at(9),
                action: TradeAction::Buy,
                symbol: "bitcoin".to_string(),
                quantity: dec!(0.1),
                price: dec!(44000),
                profit_loss: None,
            },
        ]
    }

    #[tokio::test]
    async fn test_query_does_not_alter_fetched_trades() {
        let mut gateway = MockAccountGateway::new();
        gateway.expect_trades().returning(|| Ok(trades()));

        let view = TradesSource::new(Arc::new(gateway)).load().await.unwrap();
        let oldest_first = view.query(&TradeQuery {
            filter: TradeFilter::All,
            sort: SortField::Date,
            direction: SortDirection::Asc,
        });
        assert_eq!(oldest_first[0].action, TradeAction::Buy);
        assert_eq!(view.trades, trades());
        assert_eq!(view.stats.losing, 1);
    }
}
