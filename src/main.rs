mod analytics;
mod chain;
mod config;
mod db;
mod errors;
mod feeds;
mod risk;
mod server;
mod state;
mod strategy;
mod upstox;
mod volatility;

use crate::state::AppState;

#[tokio::main]
async fn main() {
    // Structured logging (stderr, env-filtered)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("volguard engine starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    // Init database
    let db_pool = match db::init_db(&cfg.data_dir) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("database init error: {e}");
            std::process::exit(1);
        }
    };

    let port = cfg.server_port;
    let app_state = AppState::new(cfg, db_pool);

    let app = axum::Router::new()
        .route("/api/chain/analyze", axum::routing::post(server::routes::analyze_chain))
        .route("/api/chain/live", axum::routing::get(server::routes::live_chain))
        .route("/api/regime/score", axum::routing::post(server::routes::regime_score))
        .route("/api/risk/check", axum::routing::post(server::routes::risk_check))
        .route("/api/strategy/build", axum::routing::post(server::routes::build_strategy))
        .route("/api/strategy/execute", axum::routing::post(server::routes::execute_strategy))
        .route("/api/backtest", axum::routing::post(server::routes::run_backtest))
        .route("/api/trades", axum::routing::post(server::routes::log_trade))
        .route("/api/trades/performance", axum::routing::get(server::routes::trade_performance))
        .route("/api/discipline", axum::routing::get(server::routes::discipline_score))
        .route("/api/volatility/historical", axum::routing::get(server::routes::historical_volatility))
        .route("/api/expiries", axum::routing::get(server::routes::list_expiries))
        .route("/api/funds", axum::routing::get(server::routes::funds))
        .route("/api/session", axum::routing::delete(server::routes::discard_session))
        .route("/api/counters", axum::routing::get(server::routes::get_counters))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(app_state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}
