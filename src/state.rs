use crate::chain::oi::OiLedger;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::{EngineError, EngineResult};
use crate::upstox::client::UpstoxClient;
use portable_atomic::AtomicU64;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ── Application shared state ──

pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub upstox: UpstoxClient,

    /// OI ledgers keyed by underlying+expiry session. The lock is held
    /// across the whole read-compute-overwrite pass of a normalization, so
    /// overlapping snapshot requests for the same session serialize instead
    /// of interleaving ledger reads and writes.
    ledgers: Mutex<HashMap<String, OiLedger>>,

    // Lock-free performance counters
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Arc<Self> {
        let upstox = UpstoxClient::new(&config.upstox_base_url, &config.upstox_access_token);
        Arc::new(Self {
            config,
            db,
            upstox,
            ledgers: Mutex::new(HashMap::new()),
            counters: PerfCounters::new(),
        })
    }

    /// Run `f` with exclusive access to the session's OI ledger, creating it
    /// on first use. Sessions never share ledgers, so a NIFTY weekly snapshot
    /// cannot pollute the deltas of a BANKNIFTY monthly one.
    pub fn with_session_ledger<T>(
        &self,
        underlying: &str,
        expiry: &str,
        f: impl FnOnce(&mut OiLedger) -> T,
    ) -> EngineResult<T> {
        let mut ledgers = self.ledgers.lock().map_err(|e| EngineError::Lock(e.to_string()))?;
        let ledger = ledgers.entry(session_key(underlying, expiry)).or_default();
        Ok(f(ledger))
    }

    /// Drop one session's ledger (e.g. after expiry rollover).
    pub fn discard_session(&self, underlying: &str, expiry: &str) -> EngineResult<bool> {
        let mut ledgers = self.ledgers.lock().map_err(|e| EngineError::Lock(e.to_string()))?;
        Ok(ledgers.remove(&session_key(underlying, expiry)).is_some())
    }
}

fn session_key(underlying: &str, expiry: &str) -> String {
    format!("{underlying}|{expiry}")
}

// ── Performance counters (lock-free) ──

pub struct PerfCounters {
    pub chains_processed: AtomicU64,
    pub strategies_built: AtomicU64,
    pub risk_checks: AtomicU64,
    pub trades_logged: AtomicU64,
    pub backtests_run: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            chains_processed: AtomicU64::new(0),
            strategies_built: AtomicU64::new(0),
            risk_checks: AtomicU64::new(0),
            trades_logged: AtomicU64::new(0),
            backtests_run: AtomicU64::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::OptionType;

    fn test_state() -> Arc<AppState> {
        let config = AppConfig {
            upstox_base_url: "http://localhost".into(),
            upstox_access_token: "test".into(),
            default_instrument_key: "NSE_INDEX|Nifty 50".into(),
            nifty_history_url: "http://localhost/history.csv".into(),
            max_loss_allowed: 5000.0,
            max_daily_limit: 10000.0,
            server_port: 0,
            data_dir: "data".into(),
        };
        let db = crate::db::init_db_in_memory().unwrap();
        AppState::new(config, db)
    }

    #[test]
    fn test_sessions_do_not_share_ledgers() {
        let state = test_state();
        state
            .with_session_ledger("NSE_INDEX|Nifty 50", "2026-08-13", |ledger| {
                ledger.record(22000.0, OptionType::Call, 100);
            })
            .unwrap();
        let other_delta = state
            .with_session_ledger("NSE_INDEX|Nifty Bank", "2026-08-13", |ledger| {
                ledger.delta(22000.0, OptionType::Call, 500)
            })
            .unwrap();
        assert_eq!(other_delta.change, 0, "other session must start unprimed");
    }

    #[test]
    fn test_discard_session() {
        let state = test_state();
        state
            .with_session_ledger("NSE_INDEX|Nifty 50", "2026-08-13", |ledger| {
                ledger.record(22000.0, OptionType::Put, 10);
            })
            .unwrap();
        assert!(state.discard_session("NSE_INDEX|Nifty 50", "2026-08-13").unwrap());
        assert!(!state.discard_session("NSE_INDEX|Nifty 50", "2026-08-13").unwrap());
    }
}
