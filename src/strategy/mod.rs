pub mod backtest;
pub mod legs;

use crate::errors::{EngineError, EngineResult};
use serde::Serialize;

/// Closed set of supported multi-leg strategies. Unknown identifiers are a
/// caller error, rejected before any chain work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    IronFly,
    IronCondor,
    BullPutSpread,
    BearCallSpread,
}

impl Strategy {
    /// Case-insensitive parse of the wire identifier.
    pub fn parse(name: &str) -> EngineResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "iron_fly" => Ok(Self::IronFly),
            "iron_condor" => Ok(Self::IronCondor),
            "bull_put_spread" => Ok(Self::BullPutSpread),
            "bear_call_spread" => Ok(Self::BearCallSpread),
            _ => Err(EngineError::InvalidStrategy(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IronFly => "iron_fly",
            Self::IronCondor => "iron_condor",
            Self::BullPutSpread => "bull_put_spread",
            Self::BearCallSpread => "bear_call_spread",
        }
    }

    /// Coarse worst-case loss estimate for pre-trade gating. Defined-risk
    /// structures cap out near the wing width; the 0.5 factor reflects the
    /// premium collected against it.
    pub fn estimated_max_loss(&self, offset: f64, quantity: i64) -> f64 {
        match self {
            Self::IronFly => offset * 2.0 * quantity as f64 * 0.5,
            Self::IronCondor | Self::BullPutSpread | Self::BearCallSpread => {
                offset * quantity as f64 * 0.5
            }
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// BUY/SELL side of one leg order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}
