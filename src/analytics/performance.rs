use crate::db::TradeRow;

/// Aggregate performance over the persisted trade history.
/// Used by the dashboard's summary endpoint.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub total_pnl: f64,
    pub avg_regime_score: f64,
    pub winning_trades: usize,
    pub losing_trades: usize,
}

/// Pure aggregation; empty history yields the zero summary.
pub fn compute_performance(trades: &[TradeRow]) -> PerformanceSummary {
    if trades.is_empty() {
        return PerformanceSummary::default();
    }

    let total = trades.len();
    let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
    let avg_regime_score = trades.iter().map(|t| t.regime_score).sum::<f64>() / total as f64;

    PerformanceSummary {
        total_trades: total,
        total_pnl: round2(total_pnl),
        avg_regime_score: round2(avg_regime_score),
        winning_trades: trades.iter().filter(|t| t.pnl > 0.0).count(),
        losing_trades: trades.iter().filter(|t| t.pnl < 0.0).count(),
    }
}

#[inline]
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(pnl: f64, regime_score: f64) -> TradeRow {
        TradeRow {
            id: uuid::Uuid::new_v4().to_string(),
            strategy: "bull_put_spread".into(),
            entry_price: 50.0,
            exit_price: 50.0 + pnl,
            pnl,
            regime_score,
            timestamp: "2026-08-06T10:00:00+00:00".into(),
        }
    }

    #[test]
    fn test_empty_history_zero_summary() {
        assert_eq!(compute_performance(&[]), PerformanceSummary::default());
    }

    #[test]
    fn test_aggregates() {
        let trades = vec![trade(100.0, 6.0), trade(-40.0, 8.0), trade(0.0, 4.0)];
        let summary = compute_performance(&trades);
        assert_eq!(summary.total_trades, 3);
        assert!((summary.total_pnl - 60.0).abs() < 1e-9);
        assert!((summary.avg_regime_score - 6.0).abs() < 1e-9);
        assert_eq!(summary.winning_trades, 1);
        assert_eq!(summary.losing_trades, 1);
    }
}
