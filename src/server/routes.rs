use crate::analytics::{self, performance, regime};
use crate::db::{self, NewTrade};
use crate::errors::EngineError;
use crate::feeds::history;
use crate::risk::{discipline, gate};
use crate::state::AppState;
use crate::strategy::{backtest, legs, Strategy};
use crate::upstox::types::{OrderRequest, RawStrikeRecord};
use crate::volatility::{self, HvWindow};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use portable_atomic::Ordering::Relaxed;
use std::sync::Arc;

type ApiError = (StatusCode, Json<serde_json::Value>);
type ApiResult = Result<Json<serde_json::Value>, ApiError>;

/// Caller errors surface as 400s, upstream failures keep their broker
/// status attached, everything else is a 500.
fn error_response(e: EngineError) -> ApiError {
    let status = if e.is_caller_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    tracing::error!(error = %e, "request failed");
    (status, Json(serde_json::json!({ "error": e.to_string() })))
}

// ── Request bodies ──

#[derive(serde::Deserialize)]
pub struct ChainRequest {
    pub instrument_key: Option<String>,
    pub expiry: String,
    pub data: Vec<RawStrikeRecord>,
}

#[derive(serde::Deserialize)]
pub struct StrategyRequest {
    pub strategy_name: String,
    pub spot_price: Option<f64>,
    pub quantity: i64,
    pub otm_distance: f64,
    pub data: Vec<RawStrikeRecord>,
}

#[derive(serde::Deserialize)]
pub struct BacktestRequest {
    pub strategy_name: String,
    pub quantity: i64,
    pub period_days: i64,
}

#[derive(serde::Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

// ── Chain analytics ──

/// POST /api/chain/analyze -- normalize a snapshot against the session's OI
/// ledger and compute aggregates.
pub async fn analyze_chain(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChainRequest>,
) -> ApiResult {
    let underlying = req
        .instrument_key
        .unwrap_or_else(|| state.config.default_instrument_key.clone());
    let today = Utc::now().date_naive();

    let analysis = state
        .with_session_ledger(&underlying, &req.expiry, |ledger| {
            analytics::analyze_chain(&req.data, ledger, today)
        })
        .map_err(error_response)?;

    state.counters.chains_processed.fetch_add(1, Relaxed);
    Ok(Json(serde_json::json!({
        "underlying": underlying,
        "expiry": req.expiry,
        "spot": analysis.chain.spot,
        "metrics": analysis.metrics,
        "rows": analysis.chain.rows,
    })))
}

/// GET /api/chain/live -- fetch the chain from the broker (nearest expiry
/// unless one is given) and run the same analysis as /api/chain/analyze.
pub async fn live_chain(
    State(state): State<Arc<AppState>>,
    Query(query): Query<std::collections::HashMap<String, String>>,
) -> ApiResult {
    let underlying = query
        .get("instrument_key")
        .cloned()
        .unwrap_or_else(|| state.config.default_instrument_key.clone());

    let expiry = match query.get("expiry") {
        Some(e) => e.clone(),
        None => {
            let expiries = state.upstox.get_expiries(&underlying).await.map_err(error_response)?;
            expiries.into_iter().next().ok_or_else(|| {
                error_response(EngineError::InsufficientData(format!(
                    "no option contracts listed for {underlying}"
                )))
            })?
        }
    };

    let records = state
        .upstox
        .get_option_chain(&underlying, &expiry)
        .await
        .map_err(error_response)?;

    let today = Utc::now().date_naive();
    let analysis = state
        .with_session_ledger(&underlying, &expiry, |ledger| {
            analytics::analyze_chain(&records, ledger, today)
        })
        .map_err(error_response)?;

    state.counters.chains_processed.fetch_add(1, Relaxed);
    Ok(Json(serde_json::json!({
        "underlying": underlying,
        "expiry": expiry,
        "spot": analysis.chain.spot,
        "metrics": analysis.metrics,
        "rows": analysis.chain.rows,
    })))
}

/// POST /api/regime/score
pub async fn regime_score(Json(inputs): Json<regime::RegimeInputs>) -> Json<regime::RegimeResult> {
    Json(regime::classify_regime(&inputs))
}

/// POST /api/risk/check
pub async fn risk_check(
    State(state): State<Arc<AppState>>,
    Json(inputs): Json<gate::RiskCheckInputs>,
) -> Json<gate::RiskDecision> {
    state.counters.risk_checks.fetch_add(1, Relaxed);
    Json(gate::check_trade_risk(&inputs))
}

// ── Strategy ──

/// POST /api/strategy/build -- resolve the leg set for a strategy against a
/// supplied chain snapshot. Uses a throwaway ledger: building legs must not
/// disturb the session's OI baselines.
pub async fn build_strategy(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StrategyRequest>,
) -> ApiResult {
    let strategy = Strategy::parse(&req.strategy_name).map_err(error_response)?;

    let mut scratch = crate::chain::oi::OiLedger::new();
    let chain = crate::chain::normalize::normalize_chain(&req.data, &mut scratch, Utc::now().date_naive());
    let spot = req.spot_price.filter(|s| *s > 0.0).unwrap_or(chain.spot);

    let legs = legs::build_strategy_legs(&chain.rows, spot, strategy, req.quantity, req.otm_distance)
        .map_err(error_response)?;

    state.counters.strategies_built.fetch_add(1, Relaxed);
    Ok(Json(serde_json::json!({
        "strategy": strategy,
        "spot": spot,
        "estimated_entry_premium": legs::estimated_entry_premium(&legs),
        "estimated_max_loss": strategy.estimated_max_loss(req.otm_distance, req.quantity),
        "legs": legs,
    })))
}

/// POST /api/strategy/execute -- build the leg set, gate it against the
/// configured loss limits, then submit each leg to the broker in template
/// order. Per-leg failures abort the remainder; the broker's status and
/// body propagate to the caller.
pub async fn execute_strategy(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StrategyRequest>,
) -> ApiResult {
    let strategy = Strategy::parse(&req.strategy_name).map_err(error_response)?;

    let mut scratch = crate::chain::oi::OiLedger::new();
    let chain = crate::chain::normalize::normalize_chain(&req.data, &mut scratch, Utc::now().date_naive());
    let spot = req.spot_price.filter(|s| *s > 0.0).unwrap_or(chain.spot);

    let legs = legs::build_strategy_legs(&chain.rows, spot, strategy, req.quantity, req.otm_distance)
        .map_err(error_response)?;

    // Gate against the configured limits before anything reaches the broker.
    let today = Utc::now().date_naive();
    let trades = db::get_all_trades(&state.db).map_err(error_response)?;
    let daily_pnl: f64 = trades
        .iter()
        .filter(|t| t.trade_date() == Some(today))
        .map(|t| t.pnl)
        .sum();
    let decision = gate::check_trade_risk(&gate::RiskCheckInputs {
        estimated_loss: strategy.estimated_max_loss(req.otm_distance, req.quantity),
        iv_rv_ratio: 1.0,
        max_loss_allowed: state.config.max_loss_allowed,
        daily_pnl,
        max_daily_limit: state.config.max_daily_limit,
    });
    state.counters.risk_checks.fetch_add(1, Relaxed);
    if !decision.is_allowed() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": "trade blocked by risk gate", "alerts": decision.alerts })),
        ));
    }

    let tag = format!("volguard-{}", uuid::Uuid::new_v4());
    let mut order_ids = Vec::with_capacity(legs.len());
    for leg in &legs {
        let order = OrderRequest {
            instrument_key: leg.instrument_key.clone(),
            quantity: leg.quantity,
            product: "D".into(),
            order_type: leg.order_type.into(),
            transaction_type: leg.action.as_str().into(),
            price: 0.0,
            trigger_price: 0.0,
            disclosed_quantity: 0,
            validity: "DAY".into(),
            tag: tag.clone(),
        };
        let placed = state.upstox.place_order(&order).await.map_err(error_response)?;
        order_ids.push(placed.order_id.unwrap_or_default());
    }

    state.counters.strategies_built.fetch_add(1, Relaxed);
    Ok(Json(serde_json::json!({
        "strategy": strategy,
        "tag": tag,
        "estimated_entry_premium": legs::estimated_entry_premium(&legs),
        "legs": legs,
        "order_ids": order_ids,
    })))
}

/// POST /api/backtest -- simulated backtest over the configured close series.
pub async fn run_backtest(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BacktestRequest>,
) -> ApiResult {
    let strategy = Strategy::parse(&req.strategy_name).map_err(error_response)?;
    let closes = history::fetch_history(&state.config.nifty_history_url)
        .await
        .map_err(error_response)?;
    let summary = backtest::run_backtest(&closes, strategy, req.quantity, req.period_days)
        .map_err(error_response)?;

    state.counters.backtests_run.fetch_add(1, Relaxed);
    Ok(Json(serde_json::json!(summary)))
}

// ── Trades ──

/// POST /api/trades -- append one closed trade.
pub async fn log_trade(
    State(state): State<Arc<AppState>>,
    Json(trade): Json<NewTrade>,
) -> ApiResult {
    let id = db::insert_trade(&state.db, &trade).map_err(error_response)?;
    state.counters.trades_logged.fetch_add(1, Relaxed);
    Ok(Json(serde_json::json!({ "status": "success", "trade_id": id })))
}

/// GET /api/trades/performance
pub async fn trade_performance(State(state): State<Arc<AppState>>) -> ApiResult {
    let trades = db::get_all_trades(&state.db).map_err(error_response)?;
    Ok(Json(serde_json::json!(performance::compute_performance(&trades))))
}

/// GET /api/discipline
pub async fn discipline_score(State(state): State<Arc<AppState>>) -> ApiResult {
    let trades = db::get_all_trades(&state.db).map_err(error_response)?;
    Ok(Json(serde_json::json!(discipline::discipline_score(&trades))))
}

// ── Volatility ──

/// GET /api/volatility/historical?period=7d|30d|1y|all
pub async fn historical_volatility(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult {
    let period = query.period.unwrap_or_else(|| "all".to_string());
    let windows: Vec<HvWindow> = if period == "all" {
        HvWindow::ALL.to_vec()
    } else {
        vec![HvWindow::parse(&period).map_err(error_response)?]
    };

    let closes = history::fetch_history(&state.config.nifty_history_url)
        .await
        .map_err(error_response)?;

    let mut body = serde_json::Map::new();
    for window in windows {
        body.insert(
            format!("hv_{}", window.label()),
            volatility::historical_vol(&closes, window).into(),
        );
    }
    body.insert("realized_vol_7d".into(), volatility::realized_vol(&closes).into());
    Ok(Json(serde_json::Value::Object(body)))
}

// ── Broker passthrough ──

/// GET /api/expiries?instrument_key=...
pub async fn list_expiries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<std::collections::HashMap<String, String>>,
) -> ApiResult {
    let instrument_key = query
        .get("instrument_key")
        .cloned()
        .unwrap_or_else(|| state.config.default_instrument_key.clone());
    let expiries = state
        .upstox
        .get_expiries(&instrument_key)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::json!({ "instrument_key": instrument_key, "expiries": expiries })))
}

/// GET /api/funds
pub async fn funds(State(state): State<Arc<AppState>>) -> ApiResult {
    let funds = state.upstox.get_funds_and_margin().await.map_err(error_response)?;
    let available = funds.equity.as_ref().and_then(|e| e.available_margin).unwrap_or(0.0);
    Ok(Json(serde_json::json!({ "available_margin": available })))
}

/// DELETE /api/session?instrument_key=...&expiry=... -- drop one session's
/// OI ledger, e.g. after an expiry rollover.
pub async fn discard_session(
    State(state): State<Arc<AppState>>,
    Query(query): Query<std::collections::HashMap<String, String>>,
) -> ApiResult {
    let underlying = query
        .get("instrument_key")
        .cloned()
        .unwrap_or_else(|| state.config.default_instrument_key.clone());
    let Some(expiry) = query.get("expiry") else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "missing 'expiry' query parameter" })),
        ));
    };
    let removed = state.discard_session(&underlying, expiry).map_err(error_response)?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "chains_processed": state.counters.chains_processed.load(Relaxed),
        "strategies_built": state.counters.strategies_built.load(Relaxed),
        "risk_checks": state.counters.risk_checks.load(Relaxed),
        "trades_logged": state.counters.trades_logged.load(Relaxed),
        "backtests_run": state.counters.backtests_run.load(Relaxed),
    }))
}
