use chrono::FixedOffset;
use log::info;

use crate::archive::{CsvArchive, SnapshotCache, Store};
use crate::chart_data::{parse_ohlc_payload, OhlcSource};
use crate::error::Result;
use crate::fill::fill_gaps;
use crate::merge::merge_with_archive;
use crate::models::Series;
use crate::normalize::normalize;
use crate::PERIOD;

/// Fetches, normalizes and gap-fills the most recent candles for `pair`.
pub fn get_ohlcv<S: OhlcSource>(source: &S, pair: &str, tz: &FixedOffset) -> Result<Series> {
    let payload = source.fetch_ohlc(pair)?;
    let rows = parse_ohlc_payload(&payload, PERIOD)?;
    info!("{}: fetched {} candles", pair, rows.len());

    let series = normalize(&rows, PERIOD, tz)?;
    fill_gaps(series, PERIOD)
}

/// [`get_ohlcv`] merged with the archive, written back when `archive_update` is set.
pub fn get_ohlcv_with_archive<S: OhlcSource, A: Store>(
    source: &S,
    pair: &str,
    tz: &FixedOffset,
    archive: Option<&A>,
    archive_update: bool,
) -> Result<Series> {
    let fresh = get_ohlcv(source, pair, tz)?;
    merge_with_archive(fresh, archive, archive_update, PERIOD)
}

/// Returns the cached snapshot if there is one, otherwise runs `load` and caches its result.
///
/// Only the existence of the snapshot is checked: it is never refreshed.
pub fn load_ohlcv_with_cache<F>(cache: &SnapshotCache, load: F) -> Result<Series>
where
    F: FnOnce() -> Result<Series>,
{
    if cache.exists() {
        info!("using snapshot {}", cache.path().display());
        return cache.read();
    }

    let series = load()?;
    cache.write(&series)?;
    Ok(series)
}

pub fn load_ohlcv(archive: &CsvArchive) -> Result<Series> {
    archive.read()
}
