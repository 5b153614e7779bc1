use crate::errors::{EngineError, EngineResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub upstox_base_url: String,
    pub upstox_access_token: String,
    pub default_instrument_key: String,
    pub nifty_history_url: String,
    pub max_loss_allowed: f64,
    pub max_daily_limit: f64,
    pub server_port: u16,
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let max_loss_allowed = env_var_or("MAX_LOSS_ALLOWED", "5000.0")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("MAX_LOSS_ALLOWED: {e}")))?;

        let max_daily_limit = env_var_or("MAX_DAILY_LIMIT", "10000.0")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("MAX_DAILY_LIMIT: {e}")))?;

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| EngineError::Config(format!("SERVER_PORT: {e}")))?;

        Ok(Self {
            upstox_base_url: env_var_or("UPSTOX_BASE_URL", "https://api.upstox.com/v2"),
            upstox_access_token: env_var("UPSTOX_ACCESS_TOKEN")?,
            default_instrument_key: env_var_or("DEFAULT_INSTRUMENT_KEY", "NSE_INDEX|Nifty 50"),
            nifty_history_url: env_var("NIFTY_HISTORY_URL")?,
            max_loss_allowed,
            max_daily_limit,
            server_port,
            data_dir: PathBuf::from(env_var_or("DATA_DIR", "data")),
        })
    }
}

fn env_var(key: &str) -> EngineResult<String> {
    std::env::var(key).map_err(|_| EngineError::Config(format!("missing env var: {key}")))
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
