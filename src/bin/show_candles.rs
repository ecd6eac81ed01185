extern crate cryptowatch_ohlcv;

use std::env;

use self::cryptowatch_ohlcv::archive::CsvArchive;
use self::cryptowatch_ohlcv::ohlcv::load_ohlcv;
use self::cryptowatch_ohlcv::{establish_config, PAIRS};

// cargo run --bin show_candles -- btcjpy 20

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let pair = args.next().unwrap_or_else(|| PAIRS[0].to_string());
    let count: usize = match args.next() {
        Some(n) => n.parse()?,
        None => 10,
    };

    let config = establish_config()?;
    let series = load_ohlcv(&CsvArchive::new(config.archive_path(&pair), config.tz))?;

    println!("Displaying {} of {} candles", count.min(series.len()), series.len());
    let skip = series.len().saturating_sub(count);
    for candle in series.iter().skip(skip) {
        println!(
            "{} {} {} {} {} {} {}",
            candle.open_time.to_rfc3339(),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.volume,
            candle.quote_volume
        );
    }

    Ok(())
}
