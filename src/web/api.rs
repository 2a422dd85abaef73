use axum::{
    extract::{ws::{Message, WebSocket}, Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info};

use super::{AppState, DashboardEvent};
use crate::engine::CommandOutcome;
use crate::metrics::TradeQuery;
use crate::types::TradingMode;
use crate::views::ViewKind;

// === View Endpoints ===

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now()
    }))
}

pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.views.status.state();
    let status = state.controller.current().await;
    Json(json!({
        "trading": status.as_ref().is_some_and(|s| s.state.is_trading()),
        "status": status,
        "error": view.error,
        "last_command_error": state.controller.last_error().await,
        "loading": view.loading,
        "last_updated": view.last_updated,
        "gateway": state.views.system.state()
    }))
}

pub async fn get_portfolio(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.views.portfolio.state())
}

pub async fn get_holdings(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.views.holdings.state())
}

pub async fn get_trades(
    State(state): State<AppState>,
    Query(query): Query<TradeQuery>,
) -> impl IntoResponse {
    let view = state.views.trades.state();
    Json(json!({
        "query": query,
        "trades": view.data.as_ref().map(|d| d.query(&query)),
        "stats": view.data.as_ref().map(|d| &d.stats),
        "error": view.error,
        "loading": view.loading,
        "last_updated": view.last_updated
    }))
}

pub async fn post_refresh_view(
    State(state): State<AppState>,
    Path(view): Path<String>,
) -> Response {
    match view.parse::<ViewKind>() {
        Ok(kind) => {
            state.views.refresh(kind);
            (StatusCode::ACCEPTED, Json(json!({"status": "refreshing", "view": kind}))).into_response()
        }
        Err(e) => (StatusCode::NOT_FOUND, Json(json!({"error": e}))).into_response(),
    }
}

// === Control Endpoints ===

#[derive(Debug, Default, Deserialize)]
pub struct ControlRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    pub initial_balance: Option<Decimal>,
}

fn outcome_response<T: Serialize>(state: &AppState, outcome: CommandOutcome<T>) -> Response {
    state.emit(DashboardEvent::CommandCompleted {
        command: outcome.command().to_string(),
        success: outcome.is_success(),
        error: outcome.error().map(str::to_string),
    });

    let code = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (code, Json(outcome)).into_response()
}

fn reason(body: Option<Json<ControlRequest>>) -> Option<String> {
    body.and_then(|Json(req)| req.reason).filter(|r| !r.is_empty())
}

pub async fn post_activate(
    State(state): State<AppState>,
    body: Option<Json<ControlRequest>>,
) -> Response {
    let outcome = state.controller.activate(reason(body)).await;
    outcome_response(&state, outcome)
}

pub async fn post_hold(
    State(state): State<AppState>,
    body: Option<Json<ControlRequest>>,
) -> Response {
    let outcome = state.controller.hold(reason(body)).await;
    outcome_response(&state, outcome)
}

pub async fn post_stop(
    State(state): State<AppState>,
    body: Option<Json<ControlRequest>>,
) -> Response {
    let outcome = state.controller.stop(reason(body)).await;
    outcome_response(&state, outcome)
}

pub async fn post_reset(
    State(state): State<AppState>,
    body: Option<Json<ResetRequest>>,
) -> Response {
    let initial_balance = body
        .and_then(|Json(req)| req.initial_balance)
        .unwrap_or(state.defaults.reset_balance);
    let outcome = state.controller.reset(initial_balance).await;
    outcome_response(&state, outcome)
}

// === Command Endpoints ===

#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    pub symbols: Option<Vec<String>>,
    pub mode: Option<TradingMode>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BacktestRequest {
    pub symbol: Option<String>,
    pub days: Option<u32>,
    pub initial_balance: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrainingRequest {
    pub symbols: Option<Vec<String>>,
    pub days: Option<u32>,
}

pub async fn post_run(
    State(state): State<AppState>,
    body: Option<Json<RunRequest>>,
) -> Response {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let symbols = req.symbols.unwrap_or_else(|| state.defaults.symbols.clone());
    let mode = req.mode.unwrap_or(state.defaults.mode);
    let outcome = state.controller.run_bot(symbols, mode).await;
    outcome_response(&state, outcome)
}

pub async fn post_backtest(
    State(state): State<AppState>,
    body: Option<Json<BacktestRequest>>,
) -> Response {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let symbol = match req.symbol.or_else(|| state.defaults.symbols.first().cloned()) {
        Some(symbol) => symbol,
        None => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "no symbol given"}))).into_response();
        }
    };
    let outcome = state
        .controller
        .run_backtest(
            symbol,
            req.days.unwrap_or(state.defaults.days),
            req.initial_balance.unwrap_or(state.defaults.reset_balance),
        )
        .await;
    outcome_response(&state, outcome)
}

pub async fn post_training(
    State(state): State<AppState>,
    body: Option<Json<TrainingRequest>>,
) -> Response {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let symbols = req
        .symbols
        .unwrap_or_else(|| state.defaults.training_symbols.clone());
    let outcome = state
        .controller
        .run_historical_training(symbols, req.days.unwrap_or(state.defaults.days))
        .await;
    outcome_response(&state, outcome)
}

// === WebSocket Handler ===

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.tx.subscribe();

    info!("WebSocket client connected");

    let initial = json!({
        "type": "initial",
        "status": state.controller.current().await,
        "portfolio": state.views.portfolio.state(),
        "holdings": state.views.holdings.state(),
        "trades": state.views.trades.state(),
        "system": state.views.system.state()
    });

    if let Ok(json_str) = serde_json::to_string(&initial) {
        let _ = sender.send(Message::Text(json_str)).await;
    }

    let send_task = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Ping(_)) => debug!("Received ping"),
            Ok(Message::Close(_)) => {
                info!("WebSocket client disconnected");
                break;
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
}
