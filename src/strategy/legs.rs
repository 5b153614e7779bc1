use super::{Action, Strategy};
use crate::analytics::metrics::atm_row;
use crate::chain::normalize::NormalizedStrikeRow;
use crate::chain::{strike_key, OptionType};
use crate::errors::{EngineError, EngineResult};
use smallvec::SmallVec;

/// One order instruction within a strategy. The serialized field set is the
/// stable contract with the order-submission collaborator.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StrategyLeg {
    pub instrument_key: String,
    pub strike: f64,
    pub action: Action,
    pub quantity: i64,
    pub order_type: &'static str,
    /// Quote at construction time, kept for premium estimation.
    pub ltp: f64,
    #[serde(skip)]
    pub option_type: OptionType,
}

/// Strategies have 2 or 4 legs; keep them off the heap.
pub type LegSet = SmallVec<[StrategyLeg; 4]>;

/// Derive the concrete leg set for `strategy` from a normalized chain.
///
/// Iron fly and iron condor anchor on the ATM strike and require the exact
/// offset strikes to exist; a missing strike/side drops that leg with a
/// warning. The spreads snap to the nearest available strike instead
/// (lowest strike wins an exact tie). Zero resolved legs is a hard
/// `NoValidLegs` failure -- there is nothing meaningful to submit.
pub fn build_strategy_legs(
    rows: &[NormalizedStrikeRow],
    spot: f64,
    strategy: Strategy,
    quantity: i64,
    offset: f64,
) -> EngineResult<LegSet> {
    let Some(atm) = atm_row(rows, spot).map(|r| r.strike) else {
        return Err(EngineError::NoValidLegs);
    };

    type Template = SmallVec<[(f64, OptionType, Action); 4]>;
    let template: Template = match strategy {
        Strategy::IronFly => SmallVec::from_slice(&[
            (atm, OptionType::Call, Action::Sell),
            (atm, OptionType::Put, Action::Sell),
            (atm + offset, OptionType::Call, Action::Buy),
            (atm - offset, OptionType::Put, Action::Buy),
        ]),
        Strategy::IronCondor => SmallVec::from_slice(&[
            (atm + offset, OptionType::Call, Action::Sell),
            (atm + 2.0 * offset, OptionType::Call, Action::Buy),
            (atm - offset, OptionType::Put, Action::Sell),
            (atm - 2.0 * offset, OptionType::Put, Action::Buy),
        ]),
        Strategy::BullPutSpread => {
            let sell = nearest_strike(rows, spot - offset);
            let buy = nearest_strike(rows, spot - 2.0 * offset);
            SmallVec::from_slice(&[
                (sell, OptionType::Put, Action::Sell),
                (buy, OptionType::Put, Action::Buy),
            ])
        }
        Strategy::BearCallSpread => {
            let sell = nearest_strike(rows, spot + offset);
            let buy = nearest_strike(rows, spot + 2.0 * offset);
            SmallVec::from_slice(&[
                (sell, OptionType::Call, Action::Sell),
                (buy, OptionType::Call, Action::Buy),
            ])
        }
    };

    let mut legs = LegSet::new();
    for (strike, option_type, action) in template {
        match resolve_leg(rows, strike, option_type) {
            Some((instrument_key, ltp)) => legs.push(StrategyLeg {
                instrument_key,
                strike,
                action,
                quantity,
                order_type: "MARKET",
                ltp,
                option_type,
            }),
            None => {
                tracing::warn!(
                    strategy = %strategy,
                    strike,
                    side = %option_type,
                    "no instrument at templated strike, dropping leg"
                );
            }
        }
    }

    if legs.is_empty() {
        return Err(EngineError::NoValidLegs);
    }
    Ok(legs)
}

/// Net premium at construction-time quotes: credit from sold legs minus
/// debit for bought legs, in premium points times quantity.
pub fn estimated_entry_premium(legs: &[StrategyLeg]) -> f64 {
    legs.iter()
        .map(|leg| {
            let notional = leg.ltp * leg.quantity as f64;
            match leg.action {
                Action::Sell => notional,
                Action::Buy => -notional,
            }
        })
        .sum()
}

/// Strike nearest to `target`; rows are ascending, first minimum wins, so an
/// exact tie snaps to the lower strike.
fn nearest_strike(rows: &[NormalizedStrikeRow], target: f64) -> f64 {
    let mut best = (f64::INFINITY, 0.0);
    for row in rows {
        let dist = (row.strike - target).abs();
        if dist < best.0 {
            best = (dist, row.strike);
        }
    }
    best.1
}

fn resolve_leg(
    rows: &[NormalizedStrikeRow],
    strike: f64,
    option_type: OptionType,
) -> Option<(String, f64)> {
    let row = rows.iter().find(|r| strike_key(r.strike) == strike_key(strike))?;
    let side = match option_type {
        OptionType::Call => &row.call,
        OptionType::Put => &row.put,
    };
    if side.instrument_key.is_empty() {
        return None;
    }
    Some((side.instrument_key.clone(), side.ltp))
}
