use chrono::Duration;
use log::debug;

use crate::error::{OhlcvError, Result};
use crate::models::{Candle, Series};

/// Makes the series dense: one candle every `period` seconds from the first
/// key to the last, inclusive.
///
/// A missing minute becomes a flat candle at the most recent known close with
/// zero volume. Nothing is interpolated between neighbouring prices. Every key
/// must lie on the grid anchored at the first key, otherwise
/// [`OhlcvError::Misaligned`] is returned.
pub fn fill_gaps(series: Series, period: i64) -> Result<Series> {
    check_period(period)?;
    if series.len() < 2 {
        return Ok(series);
    }

    let step = Duration::seconds(period);
    let candles = series.into_candles();
    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
    let mut synthesized = 0usize;

    let mut iter = candles.into_iter();
    if let Some(first) = iter.next() {
        out.push(first);
    }

    for candle in iter {
        // out is never empty here
        let prev = out[out.len() - 1];
        let offset = (candle.open_time - prev.open_time).num_seconds();
        if offset % period != 0 {
            return Err(OhlcvError::Misaligned {
                key: candle.open_time,
            });
        }

        let mut key = prev.open_time + step;
        while key < candle.open_time {
            out.push(Candle::flat(key, prev.close));
            synthesized += 1;
            key = key + step;
        }
        out.push(candle);
    }

    if synthesized > 0 {
        debug!("filled {} missing minutes", synthesized);
    }
    Ok(Series::from_sorted(out))
}

pub(crate) fn check_period(period: i64) -> Result<()> {
    if period <= 0 {
        return Err(OhlcvError::InvalidPeriod(period));
    }
    Ok(())
}
