use crate::chain::normalize::{NormalizedChain, NormalizedStrikeRow};

/// Rolling window for IV-skew smoothing, matching the dashboard's
/// 3-strike trailing mean.
const IV_SKEW_WINDOW: usize = 3;

/// Minimum rows with positive IV on both sides before a skew slope is
/// reported at all.
const IV_SKEW_MIN_ROWS: usize = 3;

/// Aggregate chain metrics. All fields degrade to zero on empty input --
/// the dashboard consumes these fire-and-forget, so degradation beats a
/// hard failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct ChainMetrics {
    pub pcr: f64,
    pub atm_strike: f64,
    pub atm_iv: f64,
    pub straddle_price: f64,
    pub max_pain: f64,
    pub total_call_oi: i64,
    pub total_put_oi: i64,
}

/// Fill the per-strike OI-skew and smoothed IV-skew-slope columns.
///
/// OI skew = (put OI - call OI) / (put OI + call OI + 1); the +1 keeps the
/// value finite at empty strikes and bounds it inside (-1, 1).
///
/// IV skew slope is a trailing 3-row rolling mean (min periods 1) of
/// |put IV - call IV| over the rows where both sides quote a positive IV,
/// reindexed onto the full row set with 0 for excluded rows. Fewer than 3
/// usable rows means the series is too sparse to smooth: every row gets 0.
pub fn annotate_skew(rows: &mut [NormalizedStrikeRow]) {
    for row in rows.iter_mut() {
        let put_oi = row.put.oi as f64;
        let call_oi = row.call.oi as f64;
        row.oi_skew = (put_oi - call_oi) / (put_oi + call_oi + 1.0);
        row.iv_skew_slope = 0.0;
    }

    let valid: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| r.call.iv > 0.0 && r.put.iv > 0.0)
        .map(|(i, _)| i)
        .collect();
    if valid.len() < IV_SKEW_MIN_ROWS {
        return;
    }

    let diffs: Vec<f64> = valid
        .iter()
        .map(|&i| (rows[i].put.iv - rows[i].call.iv).abs())
        .collect();

    for (pos, &row_idx) in valid.iter().enumerate() {
        let start = pos + 1 - IV_SKEW_WINDOW.min(pos + 1);
        let window = &diffs[start..=pos];
        rows[row_idx].iv_skew_slope = window.iter().sum::<f64>() / window.len() as f64;
    }
}

/// Compute aggregate metrics over a normalized chain. Pure function:
/// re-running on the same rows yields identical results.
pub fn compute_metrics(chain: &NormalizedChain) -> ChainMetrics {
    if chain.rows.is_empty() {
        return ChainMetrics::default();
    }

    let total_call_oi: i64 = chain.rows.iter().map(|r| r.call.oi).sum();
    let total_put_oi: i64 = chain.rows.iter().map(|r| r.put.oi).sum();
    let pcr = total_put_oi as f64 / total_call_oi.max(1) as f64;

    let atm = atm_row(&chain.rows, chain.spot);
    let (atm_strike, atm_iv, straddle_price) = match atm {
        Some(row) => (
            row.strike,
            (row.call.iv + row.put.iv) / 2.0,
            row.call.ltp + row.put.ltp,
        ),
        None => (0.0, 0.0, 0.0),
    };

    ChainMetrics {
        pcr,
        atm_strike,
        atm_iv,
        straddle_price,
        max_pain: max_pain_strike(&chain.rows),
        total_call_oi,
        total_put_oi,
    }
}

/// Row with minimum |strike - spot|. Rows are ascending by strike and the
/// scan keeps the first minimum, so an exact tie resolves to the lower strike.
pub fn atm_row(rows: &[NormalizedStrikeRow], spot: f64) -> Option<&NormalizedStrikeRow> {
    let mut best: Option<(&NormalizedStrikeRow, f64)> = None;
    for row in rows {
        let dist = (row.strike - spot).abs();
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((row, dist));
        }
    }
    best.map(|(row, _)| row)
}

/// Strike minimizing total loss to option writers if the underlying settled
/// there: for candidate C, sum call OI at S>C weighted by (S-C) plus put OI
/// at S<C weighted by (C-S). O(n^2) over tens of strikes; ties keep the
/// first (lowest) strike in ascending order.
fn max_pain_strike(rows: &[NormalizedStrikeRow]) -> f64 {
    let mut min_pain = f64::INFINITY;
    let mut max_pain = 0.0;
    for candidate in rows {
        let mut pain = 0.0;
        for row in rows {
            if row.strike > candidate.strike {
                pain += row.call.oi as f64 * (row.strike - candidate.strike);
            } else if row.strike < candidate.strike {
                pain += row.put.oi as f64 * (candidate.strike - row.strike);
            }
        }
        if pain < min_pain {
            min_pain = pain;
            max_pain = candidate.strike;
        }
    }
    max_pain
}
