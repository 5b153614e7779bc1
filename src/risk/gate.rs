use serde::{Deserialize, Serialize};

/// Parameters for a pre-trade risk check. Currency fields are in rupees.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RiskCheckInputs {
    pub estimated_loss: f64,
    pub iv_rv_ratio: f64,
    pub max_loss_allowed: f64,
    pub daily_pnl: f64,
    pub max_daily_limit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskStatus {
    Allow,
    Block,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskDecision {
    pub status: RiskStatus,
    pub alerts: Vec<String>,
}

impl RiskDecision {
    pub fn is_allowed(&self) -> bool {
        self.status == RiskStatus::Allow
    }
}

/// Evaluate a proposed trade against the loss limits. Pure function.
///
/// When implied vol runs above realized vol the loss estimate is amplified by
/// half the excess ratio; the adjustment never dampens the estimate. The two
/// checks are independent and a trade can trigger both alerts.
pub fn check_trade_risk(inputs: &RiskCheckInputs) -> RiskDecision {
    let mut alerts = Vec::new();

    let vol_factor = if inputs.iv_rv_ratio > 1.0 {
        1.0 + (inputs.iv_rv_ratio - 1.0) * 0.5
    } else {
        1.0
    };
    let adjusted_loss = inputs.estimated_loss * vol_factor;

    if adjusted_loss > inputs.max_loss_allowed {
        alerts.push(format!(
            "Max loss exceeded: Projected loss {adjusted_loss:.2} > Allowed {:.2}",
            inputs.max_loss_allowed
        ));
    }

    let potential_daily_pnl = inputs.daily_pnl - adjusted_loss;
    if potential_daily_pnl < -inputs.max_daily_limit.abs() {
        alerts.push(format!(
            "Daily loss limit breached: Current + Projected P&L {potential_daily_pnl:.2} < Daily limit -{:.2}",
            inputs.max_daily_limit
        ));
    }

    RiskDecision {
        status: if alerts.is_empty() { RiskStatus::Allow } else { RiskStatus::Block },
        alerts,
    }
}
