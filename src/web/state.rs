use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::{CommandDefaults, DashboardConfig, PollingSettings};
use crate::engine::{BotController, RefreshCoordinator};
use crate::gateway::AccountGateway;
use crate::types::{BotStatus, SystemStatus};
use crate::views::{
    HoldingsSource, HoldingsView, PolledView, PortfolioSource, PortfolioView, StatusSource, SystemSource,
    TradesSource, TradesView, ViewKind, ViewState,
};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum DashboardEvent {
    StatusChange { status: BotStatus },
    ViewUpdated { view: ViewKind },
    CommandCompleted {
        command: String,
        success: bool,
        error: Option<String>,
    },
}

/// The independently polled views behind the dashboard.
pub struct DashboardViews {
    pub portfolio: PolledView<PortfolioView>,
    pub holdings: PolledView<HoldingsView>,
    pub trades: PolledView<TradesView>,
    pub status: PolledView<BotStatus>,
    /// Not registered with the coordinator; commands never change upstream connectivity.
    pub system: PolledView<SystemStatus>,
}

impl DashboardViews {
    pub fn spawn(
        gateway: Arc<dyn AccountGateway>,
        controller: Arc<BotController>,
        coordinator: &RefreshCoordinator,
        polling: &PollingSettings,
    ) -> Self {
        Self {
            portfolio: PolledView::spawn(
                PortfolioSource::new(gateway.clone()),
                Duration::from_secs(polling.portfolio_interval_secs),
            )
            .register_with(coordinator),
            holdings: PolledView::spawn(
                HoldingsSource::new(gateway.clone()),
                Duration::from_secs(polling.holdings_interval_secs),
            )
            .register_with(coordinator),
            system: PolledView::spawn(
                SystemSource::new(gateway.clone()),
                Duration::from_secs(polling.system_interval_secs),
            ),
            trades: PolledView::spawn(
                TradesSource::new(gateway),
                Duration::from_secs(polling.trades_interval_secs),
            )
            .register_with(coordinator),
            status: PolledView::spawn(
                StatusSource::new(controller),
                Duration::from_secs(polling.status_interval_secs),
            )
            .register_with(coordinator),
        }
    }

    pub fn refresh(&self, kind: ViewKind) {
        match kind {
            ViewKind::Portfolio => self.portfolio.refresh(),
            ViewKind::Holdings => self.holdings.refresh(),
            ViewKind::Trades => self.trades.refresh(),
            ViewKind::Status => self.status.refresh(),
            ViewKind::System => self.system.refresh(),
        }
    }
}

/// Combined application state for the web server
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<BotController>,
    pub coordinator: RefreshCoordinator,
    pub views: Arc<DashboardViews>,
    pub defaults: Arc<CommandDefaults>,
    pub tx: broadcast::Sender<DashboardEvent>,
}

impl AppState {
    /// Builds the controller, coordinator and views. Must run inside a tokio runtime.
    pub fn new(gateway: Arc<dyn AccountGateway>, config: &DashboardConfig) -> Self {
        let coordinator = RefreshCoordinator::new();
        let controller = Arc::new(
            BotController::new(gateway.clone()).with_coordinator(coordinator.clone(), config.refresh.clone()),
        );
        let views = DashboardViews::spawn(gateway, controller.clone(), &coordinator, &config.polling);
        let (tx, _) = broadcast::channel(100);

        Self {
            controller,
            coordinator,
            views: Arc::new(views),
            defaults: Arc::new(config.defaults.clone()),
            tx,
        }
    }

    pub fn emit(&self, event: DashboardEvent) {
        let _ = self.tx.send(event);
    }

    /// Relays status changes and view updates onto the event channel.
    pub fn spawn_event_forwarders(&self) -> Vec<JoinHandle<()>> {
        vec![
            forward_status(self.controller.subscribe(), self.tx.clone()),
            forward_view_updates(ViewKind::Portfolio, self.views.portfolio.subscribe(), self.tx.clone()),
            forward_view_updates(ViewKind::Holdings, self.views.holdings.subscribe(), self.tx.clone()),
            forward_view_updates(ViewKind::Trades, self.views.trades.subscribe(), self.tx.clone()),
            forward_view_updates(ViewKind::System, self.views.system.subscribe(), self.tx.clone()),
        ]
    }
}

/// One `StatusChange` per transition, however many times the status is re-read.
fn forward_status(
    mut rx: broadcast::Receiver<BotStatus>,
    tx: broadcast::Sender<DashboardEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last: Option<BotStatus> = None;
        loop {
            match rx.recv().await {
                Ok(status) => {
                    if !last.as_ref().is_some_and(|l| l.same_transition(&status)) {
                        last = Some(status.clone());
                        let _ = tx.send(DashboardEvent::StatusChange { status });
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!("Status forwarder skipped {} updates", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn forward_view_updates<T: Clone + Send + Sync + 'static>(
    kind: ViewKind,
    mut rx: watch::Receiver<ViewState<T>>,
    tx: broadcast::Sender<DashboardEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut seen = rx.borrow().fetches;
        while rx.changed().await.is_ok() {
            let fetches = rx.borrow_and_update().fetches;
            if fetches != seen {
                seen = fetches;
                let _ = tx.send(DashboardEvent::ViewUpdated { view: kind });
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LifecycleState, StatusChange};

    fn status(state: LifecycleState, reason: &str, message: &str) -> BotStatus {
        BotStatus {
            state,
            change: StatusChange {
                at: None,
                reason: reason.to_string(),
            },
            message: message.to_string(),
            success: true,
        }
    }

    #[tokio::test]
    async fn test_one_event_per_transition() {
        let (status_tx, status_rx) = broadcast::channel(16);
        let (event_tx, mut events) = broadcast::channel(16);
        let forwarder = forward_status(status_rx, event_tx);

        status_tx
            .send(status(LifecycleState::Stopped, "Manual stop", "Bot has been stopped completely."))
            .unwrap();
        status_tx
            .send(status(LifecycleState::Stopped, "Manual stop", "Bot Status: STOPPED"))
            .unwrap();
        status_tx
            .send(status(LifecycleState::Active, "Resume", "Bot has been activated. Trading resumed."))
            .unwrap();
        drop(status_tx);
        forwarder.await.unwrap();

        let mut states = Vec::new();
        while let Ok(DashboardEvent::StatusChange { status }) = events.try_recv() {
            states.push(status.state);
        }
        assert_eq!(states, vec![LifecycleState::Stopped, LifecycleState::Active]);
    }

    #[tokio::test]
    async fn test_view_update_per_fetch() {
        let (state_tx, state_rx) = watch::channel(ViewState::<u64>::default());
        let (event_tx, mut events) = broadcast::channel(16);
        let forwarder = forward_view_updates(ViewKind::System, state_rx, event_tx);

        state_tx.send_modify(|s| s.loading = true);
        tokio::task::yield_now().await;
        state_tx.send_modify(|s| {
            s.loading = false;
            s.fetches = 1;
        });
        drop(state_tx);
        forwarder.await.unwrap();

        assert!(matches!(
            events.try_recv(),
            Ok(DashboardEvent::ViewUpdated { view: ViewKind::System })
        ));
        assert!(events.try_recv().is_err());
    }
}
