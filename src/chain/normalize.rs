use super::oi::OiLedger;
use super::{strike_key, OptionType};
use crate::upstox::types::{RawStrikeRecord, SideRecord};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One side's quote/Greek/open-interest fields after normalization.
/// A side missing from the raw record normalizes to all-zero fields and an
/// empty instrument key -- a data gap, never an error.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SideQuote {
    pub instrument_key: String,
    pub ltp: f64,
    pub iv: f64,
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
    pub oi: i64,
    pub oi_change: i64,
    pub oi_change_pct: f64,
    pub volume: i64,
    pub bid_ask_spread: f64,
    pub intrinsic_value: f64,
    pub time_value: f64,
}

/// One row per distinct strike, both sides flattened. Rows are sorted
/// ascending by strike and not mutated after the snapshot is built
/// (the skew columns are filled by analytics::metrics as the final step).
#[derive(Debug, Clone, serde::Serialize)]
pub struct NormalizedStrikeRow {
    pub strike: f64,
    pub moneyness: f64,
    pub days_to_expiry: i64,
    pub strike_pcr: f64,
    pub oi_skew: f64,
    pub iv_skew_slope: f64,
    pub call: SideQuote,
    pub put: SideQuote,
}

/// Normalized snapshot of one underlying+expiry chain.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct NormalizedChain {
    pub spot: f64,
    pub rows: Vec<NormalizedStrikeRow>,
}

/// Flatten a raw chain snapshot into a strike-indexed table.
///
/// Reads OI baselines from `ledger` for every row first, then overwrites the
/// ledger with the current snapshot -- a snapshot never observes its own
/// writes. Empty input returns an empty chain; callers treat that as
/// "no data", not an error.
pub fn normalize_chain(
    records: &[RawStrikeRecord],
    ledger: &mut OiLedger,
    today: NaiveDate,
) -> NormalizedChain {
    if records.is_empty() {
        return NormalizedChain::default();
    }

    let spot = records
        .iter()
        .filter_map(|r| r.underlying_spot_price)
        .find(|s| *s > 0.0)
        .unwrap_or(0.0);

    // BTreeMap on the quantized strike gives ascending order and
    // one-row-per-strike in a single pass; first record wins on duplicates.
    let mut by_strike: BTreeMap<i64, NormalizedStrikeRow> = BTreeMap::new();

    for record in records {
        let key = strike_key(record.strike_price);
        if by_strike.contains_key(&key) {
            continue;
        }

        let strike = record.strike_price;
        let call = side_quote(record.call_options.as_ref(), ledger, strike, spot, OptionType::Call);
        let put = side_quote(record.put_options.as_ref(), ledger, strike, spot, OptionType::Put);

        let strike_pcr = put.oi as f64 / call.oi.max(1) as f64;

        by_strike.insert(
            key,
            NormalizedStrikeRow {
                strike,
                moneyness: if spot > 0.0 { strike / spot } else { 0.0 },
                days_to_expiry: days_to_expiry(record.expiry.as_deref(), today),
                strike_pcr,
                oi_skew: 0.0,
                iv_skew_slope: 0.0,
                call,
                put,
            },
        );
    }

    let rows: Vec<NormalizedStrikeRow> = by_strike.into_values().collect();

    // Whole-snapshot overwrite, after every delta above was computed.
    for row in &rows {
        ledger.record(row.strike, OptionType::Call, row.call.oi);
        ledger.record(row.strike, OptionType::Put, row.put.oi);
    }

    tracing::debug!(rows = rows.len(), ledger_entries = ledger.len(), spot, "chain normalized");
    NormalizedChain { spot, rows }
}

fn side_quote(
    side: Option<&SideRecord>,
    ledger: &OiLedger,
    strike: f64,
    spot: f64,
    option_type: OptionType,
) -> SideQuote {
    let Some(side) = side else {
        return SideQuote::default();
    };

    let md = side.market_data.clone().unwrap_or_default();
    let gk = side.option_greeks.clone().unwrap_or_default();

    let ltp = md.ltp.unwrap_or(0.0);
    let oi = md.oi.unwrap_or(0.0).round() as i64;
    let delta = ledger.delta(strike, option_type, oi);

    let intrinsic_value = match option_type {
        OptionType::Call => (spot - strike).max(0.0),
        OptionType::Put => (strike - spot).max(0.0),
    };

    SideQuote {
        instrument_key: side.instrument_key.clone().unwrap_or_default(),
        ltp,
        iv: gk.iv.unwrap_or(0.0),
        delta: gk.delta.unwrap_or(0.0),
        gamma: gk.gamma.unwrap_or(0.0),
        theta: gk.theta.unwrap_or(0.0),
        vega: gk.vega.unwrap_or(0.0),
        rho: gk.rho.unwrap_or(0.0),
        oi,
        oi_change: delta.change,
        oi_change_pct: delta.change_pct,
        volume: md.volume.unwrap_or(0),
        bid_ask_spread: md.ask_price.unwrap_or(0.0) - md.bid_price.unwrap_or(0.0),
        intrinsic_value,
        time_value: ltp - intrinsic_value,
    }
}

/// Calendar days from `today` to the record's expiry; 0 when the expiry is
/// absent or unparseable.
fn days_to_expiry(expiry: Option<&str>, today: NaiveDate) -> i64 {
    expiry
        .and_then(|e| NaiveDate::parse_from_str(e, "%Y-%m-%d").ok())
        .map(|d| (d - today).num_days())
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::upstox::types::{MarketData, OptionGreeks};

    pub(crate) fn record(
        strike: f64,
        spot: f64,
        ce: Option<(f64, f64, f64)>, // (ltp, iv, oi)
        pe: Option<(f64, f64, f64)>,
    ) -> RawStrikeRecord {
        let side = |tag: &str, vals: (f64, f64, f64)| SideRecord {
            instrument_key: Some(format!("NSE_FO|{tag}{strike}")),
            market_data: Some(MarketData {
                ltp: Some(vals.0),
                volume: Some(1000),
                oi: Some(vals.2),
                close_price: None,
                bid_price: Some(vals.0 - 0.5),
                bid_qty: Some(50),
                ask_price: Some(vals.0 + 0.5),
                ask_qty: Some(50),
            }),
            option_greeks: Some(OptionGreeks {
                iv: Some(vals.1),
                delta: Some(0.5),
                gamma: Some(0.001),
                theta: Some(-4.0),
                vega: Some(10.0),
                rho: Some(1.0),
            }),
        };
        RawStrikeRecord {
            expiry: Some("2026-08-13".to_string()),
            strike_price: strike,
            underlying_key: Some("NSE_INDEX|Nifty 50".to_string()),
            underlying_spot_price: Some(spot),
            call_options: ce.map(|v| side("CE", v)),
            put_options: pe.map(|v| side("PE", v)),
            pcr: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    #[test]
    fn test_one_row_per_strike_sorted_ascending() {
        let records = vec![
            record(22100.0, 22040.0, Some((80.0, 14.0, 100.0)), Some((130.0, 15.0, 200.0))),
            record(21900.0, 22040.0, Some((190.0, 13.0, 50.0)), Some((60.0, 14.5, 400.0))),
            record(22000.0, 22040.0, Some((120.0, 13.5, 80.0)), Some((90.0, 14.8, 300.0))),
        ];
        let mut ledger = OiLedger::new();
        let chain = normalize_chain(&records, &mut ledger, today());
        assert_eq!(chain.rows.len(), 3);
        let strikes: Vec<f64> = chain.rows.iter().map(|r| r.strike).collect();
        assert_eq!(strikes, vec![21900.0, 22000.0, 22100.0]);
        assert_eq!(chain.spot, 22040.0);
    }

    #[test]
    fn test_missing_side_defaults_to_zero() {
        let records = vec![record(22000.0, 22040.0, Some((120.0, 13.5, 80.0)), None)];
        let mut ledger = OiLedger::new();
        let chain = normalize_chain(&records, &mut ledger, today());
        let row = &chain.rows[0];
        assert_eq!(row.put.ltp, 0.0);
        assert_eq!(row.put.oi, 0);
        assert!(row.put.instrument_key.is_empty());
        assert!(row.call.oi > 0);
    }

    #[test]
    fn test_empty_input_is_empty_result() {
        let mut ledger = OiLedger::new();
        let chain = normalize_chain(&[], &mut ledger, today());
        assert!(chain.rows.is_empty());
        assert!(ledger.is_empty(), "empty snapshot must not touch the ledger");
    }

    #[test]
    fn test_oi_change_across_snapshots() {
        let mut ledger = OiLedger::new();
        let first = vec![record(22000.0, 22040.0, Some((120.0, 13.5, 100.0)), None)];
        let chain = normalize_chain(&first, &mut ledger, today());
        assert_eq!(chain.rows[0].call.oi_change, 0, "first observation is its own baseline");

        let second = vec![record(22000.0, 22040.0, Some((118.0, 13.4, 140.0)), None)];
        let chain = normalize_chain(&second, &mut ledger, today());
        assert_eq!(chain.rows[0].call.oi_change, 40);
        assert!((chain.rows[0].call.oi_change_pct - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_derived_fields() {
        let records = vec![record(21900.0, 22040.0, Some((190.0, 13.0, 50.0)), Some((60.0, 14.5, 400.0)))];
        let mut ledger = OiLedger::new();
        let chain = normalize_chain(&records, &mut ledger, today());
        let row = &chain.rows[0];
        // ITM call: intrinsic = spot - strike
        assert!((row.call.intrinsic_value - 140.0).abs() < 1e-9);
        assert!((row.call.time_value - 50.0).abs() < 1e-9);
        // OTM put at the same strike has zero intrinsic
        assert_eq!(row.put.intrinsic_value, 0.0);
        assert!((row.moneyness - 21900.0 / 22040.0).abs() < 1e-12);
        assert_eq!(row.days_to_expiry, 7);
        assert!((row.strike_pcr - 8.0).abs() < 1e-9);
        assert!((row.call.bid_ask_spread - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_strike_first_record_wins() {
        let records = vec![
            record(22000.0, 22040.0, Some((120.0, 13.5, 80.0)), None),
            record(22000.0, 22040.0, Some((999.0, 99.0, 999.0)), None),
        ];
        let mut ledger = OiLedger::new();
        let chain = normalize_chain(&records, &mut ledger, today());
        assert_eq!(chain.rows.len(), 1);
        assert_eq!(chain.rows[0].call.ltp, 120.0);
    }
}
