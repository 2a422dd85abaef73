use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{AccountGateway, CredentialStore};
use crate::config::GatewaySettings;
use crate::error::{DashboardError, DashboardResult};
use crate::types::{
    AccountBalance, AnalysisReport, AuthResponse, BacktestReport, BalanceSnapshot, BotStatus,
    Holding, LifecycleCommand, LoginRequest, PortfolioSummary, RegisterRequest, SystemStatus, Trade,
    TradingMode,
};

/// JSON-over-HTTP client for the account gateway.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpGateway {
    pub fn new(settings: &GatewaySettings, credentials: Arc<dyn CredentialStore>) -> DashboardResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> DashboardResult<T> {
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!("Gateway answered 401, discarding session token");
            self.credentials.clear();
            return Err(DashboardError::Auth("session expired or missing".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DashboardError::Transport(format!("HTTP {}: {}", status, body.trim())));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> DashboardResult<T> {
        debug!("GET {}", path);
        self.send(self.client.get(self.url(path))).await
    }

    async fn post_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> DashboardResult<T> {
        debug!("POST {}", path);
        self.send(self.client.post(self.url(path)).query(query)).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> DashboardResult<T> {
        debug!("POST {}", path);
        self.send(self.client.post(self.url(path)).json(body)).await
    }
}

/// Endpoint and query for each lifecycle command.
fn lifecycle_endpoint(command: &LifecycleCommand) -> (&'static str, Vec<(&'static str, String)>) {
    let reason_query = |reason: &Option<String>| {
        reason
            .iter()
            .map(|r| ("reason", r.clone()))
            .collect::<Vec<_>>()
    };

    match command {
        LifecycleCommand::Activate { reason } => ("/bot/activate", reason_query(reason)),
        LifecycleCommand::Hold { reason } => ("/bot/hold", reason_query(reason)),
        LifecycleCommand::Stop { reason } => ("/bot/stop", reason_query(reason)),
        LifecycleCommand::Reset { initial_balance } => {
            ("/bot/reset", vec![("initialBalance", initial_balance.to_string())])
        }
    }
}

#[async_trait]
impl AccountGateway for HttpGateway {
    async fn login(&self, request: LoginRequest) -> DashboardResult<AuthResponse> {
        self.post_json("/auth/login", &request).await
    }

    async fn register(&self, request: RegisterRequest) -> DashboardResult<AuthResponse> {
        self.post_json("/auth/register", &request).await
    }

    async fn logout(&self) -> DashboardResult<AuthResponse> {
        self.post_query("/auth/logout", &[]).await
    }

    async fn profile(&self) -> DashboardResult<AuthResponse> {
        self.get("/auth/profile").await
    }

    async fn bot_status(&self) -> DashboardResult<BotStatus> {
        self.get("/bot/status").await
    }

    async fn send_lifecycle(&self, command: LifecycleCommand) -> DashboardResult<BotStatus> {
        let (path, query) = lifecycle_endpoint(&command);
        self.post_query(path, &query).await
    }

    async fn run_bot(&self, symbols: Vec<String>, mode: TradingMode) -> DashboardResult<AnalysisReport> {
        let query = [("coins", symbols.join(",")), ("mode", mode.to_string())];
        self.post_query("/bot/run", &query).await
    }

    async fn run_backtest(
        &self,
        symbol: String,
        days: u32,
        initial_balance: Decimal,
    ) -> DashboardResult<BacktestReport> {
        let query = [
            ("coinId", symbol),
            ("days", days.to_string()),
            ("initialBalance", initial_balance.to_string()),
        ];
        self.post_query("/bot/backtest", &query).await
    }

    async fn run_historical_training(
        &self,
        symbols: Vec<String>,
        days: u32,
    ) -> DashboardResult<AnalysisReport> {
        let query = [("coins", symbols.join(",")), ("days", days.to_string())];
        self.post_query("/bot/historical-training", &query).await
    }

    async fn balance(&self) -> DashboardResult<AccountBalance> {
        self.get("/user/balance").await
    }

    async fn balance_history(&self) -> DashboardResult<Vec<BalanceSnapshot>> {
        self.get("/user/balance/history").await
    }

    async fn trades(&self) -> DashboardResult<Vec<Trade>> {
        self.get("/user/trades").await
    }

    async fn holdings(&self) -> DashboardResult<Vec<Holding>> {
        self.get("/user/holdings").await
    }

    async fn detailed_holdings(&self) -> DashboardResult<Vec<Holding>> {
        self.get("/user/holdings/detailed").await
    }

    async fn portfolio_summary(&self) -> DashboardResult<PortfolioSummary> {
        self.get("/user/portfolio/summary").await
    }

    async fn system_status(&self) -> DashboardResult<SystemStatus> {
        self.get("/api/status").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryCredentials;
    use crate::types::LifecycleState;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::HashMap;

    const GOOD_TOKEN: &str = "good-token";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", GOOD_TOKEN))
            .unwrap_or(false)
    }

    async fn status_handler(headers: HeaderMap) -> axum::response::Response {
        if !authorized(&headers) {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        Json(json!({
            "status": "ACTIVE",
            "lastStatusChange": "2024-01-15T10:30:00",
            "statusChangeReason": "Bot initialized",
            "message": "running",
            "success": true
        }))
        .into_response()
    }

    async fn stop_handler(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
        Json(json!({
            "status": "STOPPED",
            "lastStatusChange": "2024-01-15T11:00:00",
            "statusChangeReason": params.get("reason").cloned().unwrap_or_default(),
            "message": "stopped",
            "success": true
        }))
    }

    async fn reset_handler(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
        Json(json!({
            "status": "ACTIVE",
            "statusChangeReason": format!("reset to {}", params["initialBalance"]),
            "success": true
        }))
    }

    async fn history_handler() -> Json<serde_json::Value> {
        Json(json!([
            {"date": "2024-01-15", "cash_balance": 900, "holdings_value": 55000, "total_portfolio_value": 55900},
            {"date": "2024-01-01", "cash_balance": 50000, "holdings_value": 0, "total_portfolio_value": 50000}
        ]))
    }

    async fn balance_handler() -> Json<serde_json::Value> {
        Json(json!({"error": "Authentication required", "balance": 0.0}))
    }

    async fn holdings_handler() -> Json<serde_json::Value> {
        Json(json!([
            {"symbol": "bitcoin", "quantity": 0.25, "created_at": "2024-01-02T09:00:00", "updated_at": null}
        ]))
    }

    async fn system_handler() -> Json<serde_json::Value> {
        Json(json!({
            "usingApiKey": false,
            "apiKeyType": null,
            "timestamp": "2024-01-15T10:30:00",
            "apiConnected": false,
            "lastTestMessage": "API connection failed: Connection refused"
        }))
    }

    async fn broken_handler() -> impl IntoResponse {
        (AxumStatus::INTERNAL_SERVER_ERROR, "boom")
    }

    async fn spawn_fake_gateway() -> String {
        let app = Router::new()
            .route("/bot/status", get(status_handler))
            .route("/bot/stop", post(stop_handler))
            .route("/bot/reset", post(reset_handler))
            .route("/user/balance/history", get(history_handler))
            .route("/user/trades", get(broken_handler))
            .route("/api/status", get(system_handler))
            .route("/user/balance", get(balance_handler))
            .route("/user/holdings", get(holdings_handler));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn gateway(base_url: String, credentials: Arc<dyn CredentialStore>) -> HttpGateway {
        let settings = GatewaySettings {
            base_url,
            ..GatewaySettings::default()
        };
        HttpGateway::new(&settings, credentials).unwrap()
    }

    #[tokio::test]
    async fn test_bearer_token_is_attached() {
        let base = spawn_fake_gateway().await;
        let credentials = Arc::new(MemoryCredentials::with_token(GOOD_TOKEN));
        let gw = gateway(base, credentials.clone());

        let status = gw.bot_status().await.unwrap();
        assert_eq!(status.state, LifecycleState::Active);
        assert_eq!(credentials.token().as_deref(), Some(GOOD_TOKEN));
    }

    #[tokio::test]
    async fn test_unauthorized_discards_token() {
        let base = spawn_fake_gateway().await;
        let credentials = Arc::new(MemoryCredentials::with_token("stale-token"));
        let gw = gateway(base, credentials.clone());

        let err = gw.bot_status().await.unwrap_err();
        assert!(err.is_auth());
        assert!(credentials.token().is_none());
    }

    #[tokio::test]
    async fn test_lifecycle_commands_map_to_endpoints() {
        let base = spawn_fake_gateway().await;
        let gw = gateway(base, Arc::new(MemoryCredentials::new()));

        let stopped = gw
            .send_lifecycle(LifecycleCommand::Stop { reason: Some("Manual stop".to_string()) })
            .await
            .unwrap();
        assert_eq!(stopped.state, LifecycleState::Stopped);
        assert_eq!(stopped.reason(), "Manual stop");

        let reset = gw
            .send_lifecycle(LifecycleCommand::Reset { initial_balance: dec!(2500) })
            .await
            .unwrap();
        assert_eq!(reset.reason(), "reset to 2500");
    }

    #[tokio::test]
    async fn test_balance_history_decodes() {
        let base = spawn_fake_gateway().await;
        let gw = gateway(base, Arc::new(MemoryCredentials::new()));

        let history = gw.balance_history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].total(), dec!(55900));
    }

    #[tokio::test]
    async fn test_system_status_reports_upstream_outage() {
        let base = spawn_fake_gateway().await;
        let gw = gateway(base, Arc::new(MemoryCredentials::new()));

        let system = gw.system_status().await.unwrap();
        assert!(!system.api_connected);
        assert_eq!(system.key_label(), "None (Free tier)");
        assert!(system.last_test_message.unwrap().contains("Connection refused"));
    }

    #[tokio::test]
    async fn test_balance_error_shape_and_plain_holdings() {
        let base = spawn_fake_gateway().await;
        let gw = gateway(base, Arc::new(MemoryCredentials::new()));

        let balance = gw.balance().await.unwrap();
        assert_eq!(balance.error.as_deref(), Some("Authentication required"));
        assert_eq!(balance.balance, Decimal::ZERO);
        assert!(!balance.success);

        let holdings = gw.holdings().await.unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].quantity, dec!(0.25));
        assert_eq!(holdings[0].current_price, Decimal::ZERO);
        assert!(holdings[0].acquired_at.is_some());
    }

    #[tokio::test]
    async fn test_server_error_is_transport_error() {
        let base = spawn_fake_gateway().await;
        let gw = gateway(base, Arc::new(MemoryCredentials::new()));

        match gw.trades().await {
            Err(DashboardError::Transport(msg)) => assert!(msg.contains("500")),
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_transport_error() {
        let gw = gateway("http://127.0.0.1:1".to_string(), Arc::new(MemoryCredentials::new()));
        assert!(matches!(gw.bot_status().await, Err(DashboardError::Transport(_))));
    }
}
