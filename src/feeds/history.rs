use crate::errors::{EngineError, EngineResult};
use chrono::NaiveDate;

/// One daily close of the underlying index.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

/// Fetch the historical close series used by the backtest and HV calcs.
/// The engine does not retry; the caller owns retry policy and timeouts.
pub async fn fetch_history(url: &str) -> EngineResult<Vec<DailyClose>> {
    let resp = reqwest::get(url).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(EngineError::Network(format!("history fetch failed: {status}")));
    }
    let text = resp.text().await?;
    parse_history_csv(text.as_bytes())
}

/// Parse a `Date,Close` CSV (exchange bhavcopy format, dates like
/// `06-Aug-2026`). Rows with unparseable dates or closes are skipped;
/// the result is sorted ascending by date.
pub fn parse_history_csv<R: std::io::Read>(reader: R) -> EngineResult<Vec<DailyClose>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let date_idx = column(&headers, "Date")?;
    let close_idx = column(&headers, "Close")?;

    let mut closes = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let date = row
            .get(date_idx)
            .and_then(|d| NaiveDate::parse_from_str(d, "%d-%b-%Y").ok());
        let close = row.get(close_idx).and_then(|c| c.parse::<f64>().ok());
        if let (Some(date), Some(close)) = (date, close) {
            closes.push(DailyClose { date, close });
        }
    }
    closes.sort_by_key(|c| c.date);
    Ok(closes)
}

fn column(headers: &csv::StringRecord, name: &str) -> EngineResult<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| EngineError::Parse(format!("CSV missing '{name}' column")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sorts_and_skips_bad_rows() {
        let csv = "Date, Close ,Volume\n\
                   05-Aug-2026,22010.5,100\n\
                   bogus,22000.0,100\n\
                   04-Aug-2026,21990.0,100\n\
                   06-Aug-2026,not-a-number,100\n";
        let closes = parse_history_csv(csv.as_bytes()).unwrap();
        assert_eq!(closes.len(), 2);
        assert_eq!(closes[0].date, NaiveDate::from_ymd_opt(2026, 8, 4).unwrap());
        assert_eq!(closes[1].close, 22010.5);
    }

    #[test]
    fn test_missing_close_column_is_parse_error() {
        let err = parse_history_csv("Date,Open\n05-Aug-2026,1.0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }
}
