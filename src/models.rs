use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::{OhlcvError, Result};

/// One upstream row, positionally mapped:
/// `[closeTime, open, high, low, close, volume, quoteVolume]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RawCandle {
    pub close_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub quote_volume: f64,
}

/// One minute of market data keyed by the instant the minute opened.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub quote_volume: f64,
}

impl Candle {
    /// A minute without trades: every price at `price`, no volume.
    pub fn flat(open_time: DateTime<FixedOffset>, price: f64) -> Candle {
        Candle {
            open_time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
            quote_volume: 0.0,
        }
    }
}

/// Candles sorted by `open_time` with no duplicate keys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
    candles: Vec<Candle>,
}

impl Series {
    pub fn empty() -> Series {
        Series::default()
    }

    /// Builds a series, rejecting input whose keys are not strictly increasing.
    pub fn new(candles: Vec<Candle>) -> Result<Series> {
        if let Some(pair) = candles
            .windows(2)
            .find(|pair| pair[1].open_time <= pair[0].open_time)
        {
            return Err(OhlcvError::UnorderedSeries {
                key: pair[1].open_time,
            });
        }
        Ok(Series { candles })
    }

    // callers inside the crate that already produce ordered keys
    pub(crate) fn from_sorted(candles: Vec<Candle>) -> Series {
        debug_assert!(candles
            .windows(2)
            .all(|pair| pair[0].open_time < pair[1].open_time));
        Series { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first_key(&self) -> Option<DateTime<FixedOffset>> {
        self.candles.first().map(|c| c.open_time)
    }

    /// The most recent key. For an archive this is the merge boundary.
    pub fn last_key(&self) -> Option<DateTime<FixedOffset>> {
        self.candles.last().map(|c| c.open_time)
    }

    pub fn candle_at(&self, key: DateTime<FixedOffset>) -> Option<&Candle> {
        self.candles
            .binary_search_by(|c| c.open_time.cmp(&key))
            .ok()
            .map(|i| &self.candles[i])
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}
