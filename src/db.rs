use crate::errors::{EngineError, EngineResult};
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub type DbPool = Arc<Mutex<Connection>>;

pub fn init_db(data_dir: &Path) -> EngineResult<DbPool> {
    std::fs::create_dir_all(data_dir).map_err(|e| EngineError::Database(format!("create dir: {e}")))?;
    let db_path = data_dir.join("volguard.db");
    let conn = Connection::open(&db_path)?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA cache_size=-64000;")?;

    let schema = include_str!("../migrations/001_init.sql");
    conn.execute_batch(schema)?;

    tracing::info!("database initialized at {}", db_path.display());
    Ok(Arc::new(Mutex::new(conn)))
}

/// In-memory database for tests and dry runs.
pub fn init_db_in_memory() -> EngineResult<DbPool> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(include_str!("../migrations/001_init.sql"))?;
    Ok(Arc::new(Mutex::new(conn)))
}

// ── Row types ──

/// A closed trade. Written once, never mutated, read in bulk for analytics
/// and discipline scoring.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TradeRow {
    pub id: String,
    pub strategy: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub regime_score: f64,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

impl TradeRow {
    /// Calendar day of the trade, for overtrading checks. None when the
    /// stored timestamp does not parse.
    pub fn trade_date(&self) -> Option<NaiveDate> {
        self.timestamp
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewTrade {
    pub strategy: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub regime_score: f64,
}

// ── Trade persistence ──

pub fn insert_trade(db: &DbPool, trade: &NewTrade) -> EngineResult<String> {
    let conn = db.lock().map_err(|e| EngineError::Lock(e.to_string()))?;
    let id = uuid::Uuid::new_v4().to_string();
    let timestamp = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO trades (id, strategy, entry_price, exit_price, pnl, regime_score, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            id,
            trade.strategy,
            trade.entry_price,
            trade.exit_price,
            trade.pnl,
            trade.regime_score,
            timestamp
        ],
    )?;
    Ok(id)
}

pub fn get_all_trades(db: &DbPool) -> EngineResult<Vec<TradeRow>> {
    let conn = db.lock().map_err(|e| EngineError::Lock(e.to_string()))?;
    let mut stmt = conn.prepare(
        "SELECT id, strategy, entry_price, exit_price, pnl, regime_score, timestamp
         FROM trades ORDER BY timestamp",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(TradeRow {
            id: row.get(0)?,
            strategy: row.get(1)?,
            entry_price: row.get(2)?,
            exit_price: row.get(3)?,
            pnl: row.get(4)?,
            regime_score: row.get(5)?,
            timestamp: row.get(6)?,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_read_back() {
        let db = init_db_in_memory().unwrap();
        let id = insert_trade(
            &db,
            &NewTrade {
                strategy: "iron_fly".into(),
                entry_price: 215.0,
                exit_price: 180.0,
                pnl: 35.0 * 75.0,
                regime_score: 7.0,
            },
        )
        .unwrap();
        let trades = get_all_trades(&db).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].id, id);
        assert_eq!(trades[0].strategy, "iron_fly");
        assert!(trades[0].trade_date().is_some());
    }

    #[test]
    fn test_trade_date_parses_rfc3339_prefix() {
        let row = TradeRow {
            id: "t".into(),
            strategy: "iron_condor".into(),
            entry_price: 0.0,
            exit_price: 0.0,
            pnl: 0.0,
            regime_score: 0.0,
            timestamp: "2026-08-06T10:15:00+00:00".into(),
        };
        assert_eq!(row.trade_date(), NaiveDate::from_ymd_opt(2026, 8, 6));
    }
}
