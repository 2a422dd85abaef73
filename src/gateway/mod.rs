pub mod credentials;
pub mod http;

pub use credentials::*;
pub use http::*;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::DashboardResult;
use crate::types::{
    AccountBalance, AnalysisReport, AuthResponse, BacktestReport, BalanceSnapshot, BotStatus,
    Holding, LifecycleCommand, LoginRequest, PortfolioSummary, RegisterRequest, SystemStatus, Trade,
    TradingMode,
};

/// The remote service that owns bot, account and trade state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountGateway: Send + Sync {
    async fn login(&self, request: LoginRequest) -> DashboardResult<AuthResponse>;
    async fn register(&self, request: RegisterRequest) -> DashboardResult<AuthResponse>;
    async fn logout(&self) -> DashboardResult<AuthResponse>;
    async fn profile(&self) -> DashboardResult<AuthResponse>;

    async fn bot_status(&self) -> DashboardResult<BotStatus>;
    async fn send_lifecycle(&self, command: LifecycleCommand) -> DashboardResult<BotStatus>;
    async fn run_bot(&self, symbols: Vec<String>, mode: TradingMode) -> DashboardResult<AnalysisReport>;
    async fn run_backtest(
        &self,
        symbol: String,
        days: u32,
        initial_balance: Decimal,
    ) -> DashboardResult<BacktestReport>;
    async fn run_historical_training(
        &self,
        symbols: Vec<String>,
        days: u32,
    ) -> DashboardResult<AnalysisReport>;

    async fn balance(&self) -> DashboardResult<AccountBalance>;
    async fn balance_history(&self) -> DashboardResult<Vec<BalanceSnapshot>>;
    async fn trades(&self) -> DashboardResult<Vec<Trade>>;
    async fn holdings(&self) -> DashboardResult<Vec<Holding>>;
    async fn detailed_holdings(&self) -> DashboardResult<Vec<Holding>>;
    async fn portfolio_summary(&self) -> DashboardResult<PortfolioSummary>;

    /// Upstream price API connectivity as probed by the gateway.
    async fn system_status(&self) -> DashboardResult<SystemStatus>;
}
