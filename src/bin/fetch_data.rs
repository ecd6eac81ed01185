extern crate cryptowatch_ohlcv;

use log::info;

use self::cryptowatch_ohlcv::archive::{CsvArchive, SnapshotCache};
use self::cryptowatch_ohlcv::chart_data::CryptowatchClient;
use self::cryptowatch_ohlcv::ohlcv::{get_ohlcv_with_archive, load_ohlcv_with_cache};
use self::cryptowatch_ohlcv::{establish_config, pairs, PERIOD};

// cargo run --bin fetch_data

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = establish_config()?;
    let client = CryptowatchClient::new(&config, PERIOD);

    for pair in pairs() {
        let cache = SnapshotCache::new(config.cache_path(pair));
        let archive = CsvArchive::new(config.archive_path(pair), config.tz);

        let series = load_ohlcv_with_cache(&cache, || {
            get_ohlcv_with_archive(&client, pair, &config.tz, Some(&archive), true)
        })?;

        match (series.first_key(), series.last_key()) {
            (Some(first), Some(last)) => {
                info!("{}: {} candles from {} to {}", pair, series.len(), first, last)
            }
            _ => info!("{}: no candles", pair),
        }
    }

    Ok(())
}
