use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::{ViewKind, ViewSource};
use crate::error::{DashboardError, DashboardResult};
use crate::gateway::AccountGateway;
use crate::metrics::{holding_rows, summarize_holdings, HoldingRow, HoldingsSummary};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingsView {
    pub rows: Vec<HoldingRow>,
    pub summary: HoldingsSummary,
}

pub struct HoldingsSource {
    gateway: Arc<dyn AccountGateway>,
}

impl HoldingsSource {
    pub fn new(gateway: Arc<dyn AccountGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ViewSource for HoldingsSource {
    type Data = HoldingsView;

    fn kind(&self) -> ViewKind {
        ViewKind::Holdings
    }

    async fn load(&self) -> DashboardResult<HoldingsView> {
        let (holdings, summary) = tokio::try_join!(
            self.gateway.detailed_holdings(),
            self.gateway.portfolio_summary()
        )?;
        if let Some(error) = summary.error {
            return Err(DashboardError::Gateway(error));
        }

        let rows = holding_rows(&holdings);
        let summary = summarize_holdings(&rows, &summary);
        Ok(HoldingsView { rows, summary })
    }
}
