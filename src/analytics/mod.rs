pub mod metrics;
pub mod performance;
pub mod regime;

use crate::chain::normalize::{normalize_chain, NormalizedChain};
use crate::chain::oi::OiLedger;
use crate::upstox::types::RawStrikeRecord;
use chrono::NaiveDate;

/// Fully processed snapshot: normalized rows with skew columns filled,
/// plus the aggregate metrics. One call per chain request.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ChainAnalysis {
    pub chain: NormalizedChain,
    pub metrics: metrics::ChainMetrics,
}

/// Normalize a raw snapshot against the session's OI ledger, fill the
/// per-strike skew columns, and compute aggregates. Empty input degrades to
/// an empty analysis with zero-valued metrics.
pub fn analyze_chain(
    records: &[RawStrikeRecord],
    ledger: &mut OiLedger,
    today: NaiveDate,
) -> ChainAnalysis {
    let mut chain = normalize_chain(records, ledger, today);
    metrics::annotate_skew(&mut chain.rows);
    let metrics = metrics::compute_metrics(&chain);
    ChainAnalysis { chain, metrics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::normalize::tests::record;

    #[test]
    fn test_full_pipeline_fills_skew_and_metrics() {
        let records: Vec<RawStrikeRecord> = (0..5)
            .map(|i| {
                let strike = 21900.0 + i as f64 * 50.0;
                record(
                    strike,
                    22040.0,
                    Some((120.0, 13.0 + i as f64, 400.0)),
                    Some((90.0, 14.5 + i as f64, 500.0)),
                )
            })
            .collect();
        let mut ledger = OiLedger::new();
        let today = chrono::NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();

        let analysis = analyze_chain(&records, &mut ledger, today);
        assert_eq!(analysis.chain.rows.len(), 5);
        assert!(analysis.chain.rows.iter().all(|r| r.iv_skew_slope > 0.0));
        assert!(analysis.chain.rows.iter().all(|r| r.oi_skew > 0.0));
        assert_eq!(analysis.metrics.atm_strike, 22050.0);
        assert!((analysis.metrics.pcr - 2500.0 / 2000.0).abs() < 1e-9);
        assert!(analysis.metrics.max_pain > 0.0);
    }

    #[test]
    fn test_empty_snapshot_degrades_to_zero_analysis() {
        let mut ledger = OiLedger::new();
        let today = chrono::NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let analysis = analyze_chain(&[], &mut ledger, today);
        assert!(analysis.chain.rows.is_empty());
        assert_eq!(analysis.metrics, metrics::ChainMetrics::default());
    }
}
