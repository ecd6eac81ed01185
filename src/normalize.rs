use chrono::{DateTime, FixedOffset, TimeZone};

use crate::error::{OhlcvError, Result};
use crate::fill::check_period;
use crate::models::{Candle, RawCandle, Series};

/// Re-keys raw rows by the minute they opened (`closeTime - period`), shown in `tz`.
///
/// Only the six OHLCV values survive; the close time is dropped.
pub fn normalize(rows: &[RawCandle], period: i64, tz: &FixedOffset) -> Result<Series> {
    check_period(period)?;
    let candles = rows
        .iter()
        .map(|row| {
            Ok(Candle {
                open_time: open_time(row.close_time, period, tz)?,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
                quote_volume: row.quote_volume,
            })
        })
        .collect::<Result<Vec<Candle>>>()?;

    Series::new(candles)
}

pub fn open_time(close_time: i64, period: i64, tz: &FixedOffset) -> Result<DateTime<FixedOffset>> {
    close_time
        .checked_sub(period)
        .and_then(|t| tz.timestamp_opt(t, 0).single())
        .ok_or_else(|| {
            OhlcvError::MalformedPayload(format!("close time {} is out of range", close_time))
        })
}
