use log::{debug, warn};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::error::{OhlcvError, Result};
use crate::models::RawCandle;

/// Anything that can hand back the raw OHLC document for a pair.
pub trait OhlcSource {
    fn fetch_ohlc(&self, pair: &str) -> Result<Value>;
}

/// Blocking client for `GET /markets/{exchange}/{pair}/ohlc`.
pub struct CryptowatchClient {
    client: reqwest::blocking::Client,
    api_url: Url,
    exchange: String,
    period: i64,
    after: i64,
}

impl CryptowatchClient {
    pub fn new(config: &Config, period: i64) -> CryptowatchClient {
        CryptowatchClient {
            client: reqwest::blocking::Client::new(),
            api_url: config.api_url.clone(),
            exchange: config.exchange.clone(),
            period,
            after: config.after,
        }
    }

    pub fn ohlc_url(&self, pair: &str) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| OhlcvError::Config(format!("{} cannot be a base url", self.api_url)))?
            .pop_if_empty()
            .extend(&["markets", self.exchange.as_str(), pair, "ohlc"]);
        Ok(url)
    }
}

impl OhlcSource for CryptowatchClient {
    fn fetch_ohlc(&self, pair: &str) -> Result<Value> {
        let url = self.ohlc_url(pair)?;
        debug!(
            "{}: {}?periods={}&after={}",
            pair, url, self.period, self.after
        );

        let response = self
            .client
            .get(url)
            .query(&[
                ("periods", self.period.to_string()),
                ("after", self.after.to_string()),
            ])
            .send()?;

        if !response.status().is_success() {
            return Err(OhlcvError::Status {
                pair: pair.to_string(),
                status: response.status(),
            });
        }

        let body = response.text()?;
        serde_json::from_str(&body)
            .map_err(|e| OhlcvError::MalformedPayload(format!("response is not json: {}", e)))
    }
}

// [closeTime, open, high, low, close, volume, quoteVolume]
#[derive(Deserialize)]
struct CryptowatchRow(
    #[serde(deserialize_with = "deserialize_close_time")] i64,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
);

// integers may come through as floats
fn deserialize_close_time<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let t = f64::deserialize(deserializer)?;
    if t.fract() != 0.0 || !t.is_finite() {
        return Err(serde::de::Error::custom(format!(
            "close time {} is not a whole number of seconds",
            t
        )));
    }
    Ok(t as i64)
}

impl From<CryptowatchRow> for RawCandle {
    fn from(row: CryptowatchRow) -> RawCandle {
        RawCandle {
            close_time: row.0,
            open: row.1,
            high: row.2,
            low: row.3,
            close: row.4,
            volume: row.5,
            quote_volume: row.6,
        }
    }
}

/// Maps `{"result": {"<period>": [[...], ...]}}` onto raw rows.
///
/// A `result` without the period key, or with an empty list under it, means
/// there is no data and yields an empty vector. Anything else that does not
/// fit the shape is a [`OhlcvError::MalformedPayload`].
pub fn parse_ohlc_payload(payload: &Value, period: i64) -> Result<Vec<RawCandle>> {
    let result = payload
        .get("result")
        .ok_or_else(|| OhlcvError::MalformedPayload("missing `result`".to_string()))?
        .as_object()
        .ok_or_else(|| OhlcvError::MalformedPayload("`result` is not an object".to_string()))?;

    let key = period.to_string();
    let rows = match result.get(&key) {
        Some(rows) => rows,
        None => {
            warn!("no `{}` period in result, treating as no data", key);
            return Ok(vec![]);
        }
    };

    let rows: Vec<CryptowatchRow> = serde_json::from_value(rows.clone())
        .map_err(|e| OhlcvError::MalformedPayload(format!("period `{}`: {}", key, e)))?;

    let candles: Vec<RawCandle> = rows.into_iter().map(RawCandle::from).collect();

    if let Some(pair) = candles
        .windows(2)
        .find(|pair| pair[1].close_time <= pair[0].close_time)
    {
        return Err(OhlcvError::MalformedPayload(format!(
            "close times not ascending at {}",
            pair[1].close_time
        )));
    }

    if candles.is_empty() {
        warn!("period `{}` is empty, treating as no data", key);
    }
    Ok(candles)
}
