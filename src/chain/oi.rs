use super::{strike_key, OptionType};
use std::collections::HashMap;

/// Open-interest delta for one strike/side relative to the previous snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct OiDelta {
    pub change: i64,
    pub change_pct: f64,
}

/// Last-seen open interest per (strike, side), scoped to one
/// underlying+expiry session. The caller owns the lifecycle: create at session
/// start, pass `&mut` into each normalization pass, discard at session end.
/// Only chain::normalize mutates it.
///
/// Entries from strikes that drop out of later snapshots are kept -- the
/// ledger is a best-effort in-memory cache, not durable state.
#[derive(Debug, Default)]
pub struct OiLedger {
    last_seen: HashMap<(i64, OptionType), i64>,
}

impl OiLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change vs. the previous snapshot. A strike/side never seen before
    /// reports zero change (the current value is its own baseline), and
    /// change-percent is zero whenever the previous OI was zero or absent.
    pub fn delta(&self, strike: f64, side: OptionType, current_oi: i64) -> OiDelta {
        let prev = self.last_seen.get(&(strike_key(strike), side)).copied();
        let change = current_oi - prev.unwrap_or(current_oi);
        let change_pct = match prev {
            Some(p) if p > 0 => change as f64 / p as f64 * 100.0,
            _ => 0.0,
        };
        OiDelta { change, change_pct }
    }

    /// Overwrite the stored value for one strike/side. Called once per
    /// strike/side per snapshot, after all deltas for the snapshot are
    /// computed, so a snapshot never reads its own writes.
    pub fn record(&mut self, strike: f64, side: OptionType, oi: i64) {
        self.last_seen.insert((strike_key(strike), side), oi);
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_zero_change() {
        let ledger = OiLedger::new();
        let d = ledger.delta(22000.0, OptionType::Call, 500);
        assert_eq!(d.change, 0);
        assert_eq!(d.change_pct, 0.0);
    }

    #[test]
    fn test_primed_ledger_reports_delta() {
        let mut ledger = OiLedger::new();
        ledger.record(22000.0, OptionType::Call, 100);
        let d = ledger.delta(22000.0, OptionType::Call, 150);
        assert_eq!(d.change, 50);
        assert!((d.change_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_previous_oi_guards_percent() {
        let mut ledger = OiLedger::new();
        ledger.record(22000.0, OptionType::Put, 0);
        let d = ledger.delta(22000.0, OptionType::Put, 75);
        assert_eq!(d.change, 75);
        assert_eq!(d.change_pct, 0.0);
    }

    #[test]
    fn test_sides_tracked_independently() {
        let mut ledger = OiLedger::new();
        ledger.record(22000.0, OptionType::Call, 100);
        let d = ledger.delta(22000.0, OptionType::Put, 40);
        assert_eq!(d.change, 0, "put side never seen, baseline is current");
    }
}
