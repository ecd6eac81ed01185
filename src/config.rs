use std::env;
use std::path::PathBuf;

use chrono::FixedOffset;
use dotenv::dotenv;
use url::Url;

use crate::error::{OhlcvError, Result};

const DEFAULT_API_URL: &str = "https://api.cryptowat.ch";
const DEFAULT_EXCHANGE: &str = "bitflyer";
// 2001-01-01 00:00 JST
const DEFAULT_AFTER: i64 = 978274800;
const DEFAULT_TZ_OFFSET_HOURS: i32 = 9;
const DEFAULT_DATA_DIR: &str = "csv";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: Url,
    pub exchange: String,
    pub after: i64,
    pub tz: FixedOffset,
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: Url::parse(DEFAULT_API_URL).expect("default api url is valid"),
            exchange: DEFAULT_EXCHANGE.to_string(),
            after: DEFAULT_AFTER,
            tz: FixedOffset::east_opt(DEFAULT_TZ_OFFSET_HOURS * 3600)
                .expect("default offset is within a day"),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl Config {
    /// Reads `OHLCV_*` variables (after loading `.env`), falling back to defaults.
    pub fn from_env() -> Result<Config> {
        dotenv().ok();
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(raw) = lookup("OHLCV_API_URL") {
            config.api_url = Url::parse(&raw)
                .map_err(|e| OhlcvError::Config(format!("OHLCV_API_URL={}: {}", raw, e)))?;
        }
        if let Some(raw) = lookup("OHLCV_EXCHANGE") {
            if raw.trim().is_empty() {
                return Err(OhlcvError::Config("OHLCV_EXCHANGE is empty".to_string()));
            }
            config.exchange = raw;
        }
        if let Some(raw) = lookup("OHLCV_AFTER") {
            config.after = raw
                .parse::<i64>()
                .map_err(|e| OhlcvError::Config(format!("OHLCV_AFTER={}: {}", raw, e)))?;
        }
        if let Some(raw) = lookup("OHLCV_TZ_OFFSET_HOURS") {
            let hours = raw.parse::<i32>().map_err(|e| {
                OhlcvError::Config(format!("OHLCV_TZ_OFFSET_HOURS={}: {}", raw, e))
            })?;
            config.tz = tz_from_hours(hours)?;
        }
        if let Some(raw) = lookup("OHLCV_DATA_DIR") {
            config.data_dir = PathBuf::from(raw);
        }

        Ok(config)
    }

    pub fn archive_path(&self, pair: &str) -> PathBuf {
        self.data_dir.join(format!("ohlcv-{}.csv", pair))
    }

    pub fn cache_path(&self, pair: &str) -> PathBuf {
        self.data_dir.join(format!("ohlcv-{}.bin", pair))
    }
}

pub fn tz_from_hours(hours: i32) -> Result<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| OhlcvError::Config(format!("timezone offset out of range: {}h", hours)))
}
