use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use super::{api, AppState};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // View endpoints
        .route("/api/health", get(api::health_check))
        .route("/api/status", get(api::get_status))
        .route("/api/portfolio", get(api::get_portfolio))
        .route("/api/holdings", get(api::get_holdings))
        .route("/api/trades", get(api::get_trades))
        .route("/api/views/:view/refresh", post(api::post_refresh_view))
        // Control endpoints
        .route("/api/control/activate", post(api::post_activate))
        .route("/api/control/hold", post(api::post_hold))
        .route("/api/control/stop", post(api::post_stop))
        .route("/api/control/reset", post(api::post_reset))
        // One-shot commands
        .route("/api/commands/run", post(api::post_run))
        .route("/api/commands/backtest", post(api::post_backtest))
        .route("/api/commands/training", post(api::post_training))
        // WebSocket
        .route("/ws", get(api::websocket_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_dashboard_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let forwarders = state.spawn_event_forwarders();
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Dashboard server starting on http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app).await;

    for handle in forwarders {
        handle.abort();
    }
    served?;
    Ok(())
}
