use crate::errors::{EngineError, EngineResult};
use crate::feeds::history::DailyClose;
use statrs::statistics::Statistics;

/// Trading days per year, for annualizing daily return volatility.
const ANNUALIZATION_DAYS: f64 = 252.0;

/// Supported historical-volatility windows. Anything else on the wire is an
/// `UnknownPeriod` caller error. "all" is handled a level up by computing
/// every window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvWindow {
    Days7,
    Days30,
    Year1,
}

impl HvWindow {
    pub const ALL: [HvWindow; 3] = [HvWindow::Days7, HvWindow::Days30, HvWindow::Year1];

    pub fn parse(s: &str) -> EngineResult<Self> {
        match s {
            "7d" => Ok(Self::Days7),
            "30d" => Ok(Self::Days30),
            "1y" => Ok(Self::Year1),
            other => Err(EngineError::UnknownPeriod(other.to_string())),
        }
    }

    pub fn days(&self) -> usize {
        match self {
            Self::Days7 => 7,
            Self::Days30 => 30,
            Self::Year1 => 252,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Days7 => "7d",
            Self::Days30 => "30d",
            Self::Year1 => "1y",
        }
    }
}

/// Daily log returns of a close series.
pub fn log_returns(closes: &[DailyClose]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0].close > 0.0 && w[1].close > 0.0)
        .map(|w| (w[1].close / w[0].close).ln())
        .collect()
}

/// 7-day realized volatility, annualized, in percent. Sample standard
/// deviation of the last seven log returns. Too little history degrades to
/// 0 rather than failing -- this feeds the regime dashboard.
pub fn realized_vol(closes: &[DailyClose]) -> f64 {
    if closes.len() < 7 {
        tracing::warn!(closes = closes.len(), "not enough history for 7-day realized vol");
        return 0.0;
    }
    let returns = log_returns(closes);
    let start = returns.len().saturating_sub(7);
    let tail = &returns[start..];
    if tail.len() < 2 {
        return 0.0;
    }
    let vol = tail.std_dev() * ANNUALIZATION_DAYS.sqrt() * 100.0;
    if vol.is_nan() {
        0.0
    } else {
        vol
    }
}

/// Fixed-window historical volatility for one window, annualized percent,
/// rounded to 2 decimals. 0 when the series is shorter than the window.
pub fn historical_vol(closes: &[DailyClose], window: HvWindow) -> f64 {
    let returns = log_returns(closes);
    let days = window.days();
    if returns.len() < days {
        return 0.0;
    }
    let tail = &returns[returns.len() - days..];
    let vol = tail.std_dev() * ANNUALIZATION_DAYS.sqrt() * 100.0;
    (vol * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(closes: &[f64]) -> Vec<DailyClose> {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| DailyClose { date: start + Duration::days(i as i64), close })
            .collect()
    }

    #[test]
    fn test_window_parse() {
        assert_eq!(HvWindow::parse("7d").unwrap(), HvWindow::Days7);
        assert_eq!(HvWindow::parse("1y").unwrap().days(), 252);
        let err = HvWindow::parse("2w").unwrap_err();
        assert!(matches!(err, EngineError::UnknownPeriod(_)));
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_log_returns_length() {
        let closes = series(&[100.0, 101.0, 99.0, 102.0]);
        assert_eq!(log_returns(&closes).len(), 3);
    }

    #[test]
    fn test_flat_series_zero_vol() {
        let closes = series(&[100.0; 20]);
        assert_eq!(realized_vol(&closes), 0.0);
        assert_eq!(historical_vol(&closes, HvWindow::Days7), 0.0);
    }

    #[test]
    fn test_short_series_degrades_to_zero() {
        let closes = series(&[100.0, 105.0, 98.0]);
        assert_eq!(realized_vol(&closes), 0.0);
        assert_eq!(historical_vol(&closes, HvWindow::Days30), 0.0);
    }

    #[test]
    fn test_realized_vol_known_value() {
        // Alternating +1%/-1% daily moves: sample std of log returns is
        // roughly 0.01, annualized ~ 16%.
        let mut closes = vec![100.0];
        for i in 0..10 {
            let last = *closes.last().unwrap();
            closes.push(if i % 2 == 0 { last * 1.01 } else { last * 0.99 });
        }
        let vol = realized_vol(&series(&closes));
        assert!(vol > 10.0 && vol < 25.0, "annualized vol out of range: {vol}");
    }

    #[test]
    fn test_historical_vol_windows_consistent() {
        let mut closes = Vec::new();
        let mut price = 22000.0;
        for i in 0..300 {
            price *= 1.0 + 0.004 * ((i % 5) as f64 - 2.0);
            closes.push(price);
        }
        let closes = series(&closes);
        for window in HvWindow::ALL {
            let vol = historical_vol(&closes, window);
            assert!(vol > 0.0, "{} window should compute", window.label());
        }
    }
}
