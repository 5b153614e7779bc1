use crate::db::TradeRow;
use std::collections::HashMap;

/// Ratio of low-regime-score entries above which the history is flagged.
const HIGH_RISK_RATIO: f64 = 0.2;

/// Regime score below this counts as a high-risk entry.
const HIGH_RISK_SCORE: f64 = 3.0;

/// More trades than this on one calendar day is overtrading.
const MAX_TRADES_PER_DAY: usize = 3;

/// Losing-trade ratio above which the history is flagged.
const LOSS_RATIO: f64 = 0.5;

#[derive(Debug, Clone, serde::Serialize)]
pub struct DisciplineReport {
    pub score: i32,
    pub violations: Vec<String>,
}

/// Retrospective audit of a closed-trade history. Empty history is a clean
/// slate: score 100, no violations. The three checks are independent and
/// their deductions combine; the score floors at 0.
pub fn discipline_score(trades: &[TradeRow]) -> DisciplineReport {
    if trades.is_empty() {
        return DisciplineReport { score: 100, violations: Vec::new() };
    }

    let mut score = 100;
    let mut violations = Vec::new();
    let total = trades.len() as f64;

    let high_risk = trades.iter().filter(|t| t.regime_score < HIGH_RISK_SCORE).count();
    if high_risk as f64 / total > HIGH_RISK_RATIO {
        violations.push("Too many high-risk trades (low regime score)".to_string());
        score -= 20;
    }

    let mut daily_counts: HashMap<chrono::NaiveDate, usize> = HashMap::new();
    for trade in trades {
        if let Some(date) = trade.trade_date() {
            *daily_counts.entry(date).or_insert(0) += 1;
        }
    }
    let overtrading_days = daily_counts.values().filter(|&&c| c > MAX_TRADES_PER_DAY).count();
    if overtrading_days > 0 {
        violations.push(format!("Overtrading on {overtrading_days} days (>3 trades/day)"));
        score -= 10 * overtrading_days as i32;
    }

    let losing = trades.iter().filter(|t| t.pnl < 0.0).count();
    if losing as f64 / total > LOSS_RATIO {
        violations.push("More than 50% trades are losing".to_string());
        score -= 20;
    }

    DisciplineReport { score: score.max(0), violations }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(pnl: f64, regime_score: f64, day: u32) -> TradeRow {
        TradeRow {
            id: uuid::Uuid::new_v4().to_string(),
            strategy: "iron_fly".into(),
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            pnl,
            regime_score,
            timestamp: format!("2026-08-{day:02}T10:00:00+00:00"),
        }
    }

    #[test]
    fn test_empty_history_is_clean() {
        let report = discipline_score(&[]);
        assert_eq!(report.score, 100);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_fixture_two_violations() {
        // 10 trades: 3 high-risk (30% > 20%), 6 losing (60% > 50%),
        // spread over days so no overtrading fires.
        let mut trades = Vec::new();
        for i in 0..10u32 {
            let regime = if i < 3 { 2.0 } else { 7.0 };
            let pnl = if i < 6 { -100.0 } else { 250.0 };
            trades.push(trade(pnl, regime, (i % 28) + 1));
        }
        let report = discipline_score(&trades);
        assert_eq!(report.score, 60);
        assert_eq!(report.violations.len(), 2);
    }

    #[test]
    fn test_overtrading_deducts_per_day() {
        // Two days with 4 trades each -> -10 each, no other violations.
        let mut trades = Vec::new();
        for _ in 0..4 {
            trades.push(trade(10.0, 8.0, 3));
            trades.push(trade(10.0, 8.0, 4));
        }
        let report = discipline_score(&trades);
        assert_eq!(report.score, 80);
        assert_eq!(report.violations, vec!["Overtrading on 2 days (>3 trades/day)".to_string()]);
    }

    #[test]
    fn test_score_floors_at_zero() {
        // 12 days of 4 losing, low-regime trades: 20 + 120 + 20 > 100.
        let mut trades = Vec::new();
        for day in 1..=12u32 {
            for _ in 0..4 {
                trades.push(trade(-50.0, 1.0, day));
            }
        }
        let report = discipline_score(&trades);
        assert_eq!(report.score, 0);
        assert_eq!(report.violations.len(), 3);
    }

    #[test]
    fn test_exactly_at_thresholds_is_clean() {
        // 2/10 high-risk (20%, not >20%), 5/10 losing (50%, not >50%),
        // exactly 3 trades on one day (not >3).
        let mut trades = Vec::new();
        for i in 0..10u32 {
            let regime = if i < 2 { 2.0 } else { 7.0 };
            let pnl = if i < 5 { -100.0 } else { 250.0 };
            let day = if i < 3 { 1 } else { i };
            trades.push(trade(pnl, regime, day.max(1)));
        }
        let report = discipline_score(&trades);
        assert_eq!(report.score, 100);
        assert!(report.violations.is_empty());
    }
}
