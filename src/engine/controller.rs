use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};

use super::coordinator::RefreshCoordinator;
use crate::config::RefreshSettings;
use crate::error::{DashboardError, DashboardResult};
use crate::gateway::AccountGateway;
use crate::types::{AnalysisReport, BacktestReport, BotStatus, LifecycleCommand, TradingMode};

/// Result of an operator command, rendered the same way whether it worked or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome<T> {
    Succeeded { command: String, result: T },
    Failed { command: String, error: String },
}

impl<T> CommandOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Succeeded { .. })
    }

    pub fn command(&self) -> &str {
        match self {
            CommandOutcome::Succeeded { command, .. } | CommandOutcome::Failed { command, .. } => command,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CommandOutcome::Succeeded { .. } => None,
            CommandOutcome::Failed { error, .. } => Some(error),
        }
    }
}

/// Forwards lifecycle intent to the gateway and holds whatever status it returns.
///
/// No transition rules are applied locally. The held status only ever changes
/// to a status the gateway reported with `success: true`.
pub struct BotController {
    gateway: Arc<dyn AccountGateway>,
    status: RwLock<Option<BotStatus>>,
    last_error: RwLock<Option<String>>,
    status_tx: broadcast::Sender<BotStatus>,
    coordinator: Option<RefreshCoordinator>,
    refresh: RefreshSettings,
}

impl BotController {
    pub fn new(gateway: Arc<dyn AccountGateway>) -> Self {
        let (status_tx, _) = broadcast::channel(32);
        Self {
            gateway,
            status: RwLock::new(None),
            last_error: RwLock::new(None),
            status_tx,
            coordinator: None,
            refresh: RefreshSettings::default(),
        }
    }

    pub fn with_coordinator(mut self, coordinator: RefreshCoordinator, refresh: RefreshSettings) -> Self {
        self.coordinator = Some(coordinator);
        self.refresh = refresh;
        self
    }

    /// Last status adopted from the gateway, `None` before the first fetch.
    pub async fn current(&self) -> Option<BotStatus> {
        self.status.read().await.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BotStatus> {
        self.status_tx.subscribe()
    }

    async fn adopt(&self, status: BotStatus) {
        *self.status.write().await = Some(status.clone());
        *self.last_error.write().await = None;
        let _ = self.status_tx.send(status);
    }

    async fn record_error(&self, err: &DashboardError) {
        *self.last_error.write().await = Some(err.to_string());
    }

    /// Adopts `status` if the gateway marked it successful.
    async fn accept(&self, status: BotStatus) -> DashboardResult<BotStatus> {
        if status.success {
            self.adopt(status.clone()).await;
            Ok(status)
        } else {
            let message = if status.message.is_empty() {
                status.reason().to_string()
            } else {
                status.message.clone()
            };
            let err = DashboardError::Gateway(message);
            self.record_error(&err).await;
            Err(err)
        }
    }

    pub async fn refresh_status(&self) -> DashboardResult<BotStatus> {
        match self.gateway.bot_status().await {
            Ok(status) => self.accept(status).await,
            Err(e) => {
                warn!("Bot status fetch failed: {}", e);
                self.record_error(&e).await;
                Err(e)
            }
        }
    }

    pub async fn execute(&self, command: LifecycleCommand) -> CommandOutcome<BotStatus> {
        let name = command.name().to_string();
        let requested = command.requested_state();
        info!("Sending lifecycle command: {}", command);

        let result = match self.gateway.send_lifecycle(command).await {
            Ok(status) => self.accept(status).await,
            Err(e) => {
                self.record_error(&e).await;
                Err(e)
            }
        };

        match result {
            Ok(status) => {
                info!("Bot is now {} ({})", status.state, status.reason());
                if let Some(wanted) = requested.filter(|w| *w != status.state) {
                    warn!("{} asked for {} but the gateway reports {}", name, wanted, status.state);
                }
                self.fan_out_after_transition();
                CommandOutcome::Succeeded { command: name, result: status }
            }
            Err(e) => {
                error!("Lifecycle command {} failed: {}", name, e);
                CommandOutcome::Failed { command: name, error: e.to_string() }
            }
        }
    }

    pub async fn activate(&self, reason: Option<String>) -> CommandOutcome<BotStatus> {
        self.execute(LifecycleCommand::Activate { reason }).await
    }

    pub async fn hold(&self, reason: Option<String>) -> CommandOutcome<BotStatus> {
        self.execute(LifecycleCommand::Hold { reason }).await
    }

    pub async fn stop(&self, reason: Option<String>) -> CommandOutcome<BotStatus> {
        self.execute(LifecycleCommand::Stop { reason }).await
    }

    pub async fn reset(&self, initial_balance: Decimal) -> CommandOutcome<BotStatus> {
        self.execute(LifecycleCommand::Reset { initial_balance }).await
    }

    /// One immediate fan-out, then a follow-up once the gateway has settled.
    fn fan_out_after_transition(&self) {
        if let Some(coordinator) = &self.coordinator {
            coordinator.refresh_all();
            if let Some(delay) = self.refresh.followup_delay() {
                coordinator.refresh_after(delay);
            }
        }
    }

    pub async fn run_bot(&self, symbols: Vec<String>, mode: TradingMode) -> CommandOutcome<AnalysisReport> {
        let command = format!("run {} [{}]", mode, symbols.join(","));
        info!("Running bot: {}", command);

        match self.gateway.run_bot(symbols, mode).await {
            Ok(report) => {
                info!("Run finished: {}", report.summary);
                if let Some(coordinator) = &self.coordinator {
                    coordinator.refresh_after(self.refresh.command_followup_delay());
                }
                CommandOutcome::Succeeded { command, result: report }
            }
            Err(e) => {
                error!("Run failed: {}", e);
                CommandOutcome::Failed { command, error: e.to_string() }
            }
        }
    }

    pub async fn run_backtest(
        &self,
        symbol: String,
        days: u32,
        initial_balance: Decimal,
    ) -> CommandOutcome<BacktestReport> {
        let command = format!("backtest {} over {} days", symbol, days);
        info!("Running {}", command);

        match self.gateway.run_backtest(symbol, days, initial_balance).await {
            Ok(report) => {
                info!(
                    "Backtest finished: {} trades, {}% return",
                    report.total_trades, report.total_return_percentage
                );
                CommandOutcome::Succeeded { command, result: report }
            }
            Err(e) => {
                error!("Backtest failed: {}", e);
                CommandOutcome::Failed { command, error: e.to_string() }
            }
        }
    }

    pub async fn run_historical_training(
        &self,
        symbols: Vec<String>,
        days: u32,
    ) -> CommandOutcome<AnalysisReport> {
        let command = format!("historical training [{}] over {} days", symbols.join(","), days);
        info!("Running {}", command);

        match self.gateway.run_historical_training(symbols, days).await {
            Ok(report) => {
                info!("Training finished: {}", report.summary);
                CommandOutcome::Succeeded { command, result: report }
            }
            Err(e) => {
                error!("Historical training failed: {}", e);
                CommandOutcome::Failed { command, error: e.to_string() }
            }
        }
    }
}
