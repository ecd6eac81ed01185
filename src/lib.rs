pub mod archive;
pub mod chart_data;
pub mod config;
pub mod error;
pub mod fill;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod ohlcv;

pub use config::Config;
pub use error::{OhlcvError, Result};
pub use models::{Candle, Series};

/// Candle length in seconds; the only period requested.
pub const PERIOD: i64 = 60;

pub const PAIRS: [&str; 2] = ["btcfxjpy", "btcjpy"];

pub fn pairs() -> &'static [&'static str] {
    &PAIRS
}

pub fn establish_config() -> Result<Config> {
    Config::from_env()
}
