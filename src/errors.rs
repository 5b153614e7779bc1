/// Domain-specific error types for the analytics engine.
/// Two families must stay distinct:
/// - caller errors (bad strategy name, unknown HV window) -> rejected request
/// - upstream/internal failures -> propagated with context attached
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("upstox API error: {status} {body}")]
    UpstoxApi { status: u16, body: String },

    #[error("unknown strategy: {0}")]
    InvalidStrategy(String),

    #[error("no valid legs could be resolved from the option chain")]
    NoValidLegs,

    #[error("unknown volatility period: {0}")]
    UnknownPeriod(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("state lock poisoned: {0}")]
    Lock(String),
}

impl EngineError {
    /// Caller errors map to 400-class responses; everything else is a 500.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidStrategy(_)
                | EngineError::NoValidLegs
                | EngineError::UnknownPeriod(_)
                | EngineError::InsufficientData(_)
        )
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        EngineError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Database(e.to_string())
    }
}

impl From<csv::Error> for EngineError {
    fn from(e: csv::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Network(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
