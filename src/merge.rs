use log::{debug, info};

use crate::archive::Store;
use crate::error::Result;
use crate::fill::{check_period, fill_gaps};
use crate::models::Series;

/// Appends the fresh rows that are new relative to `archive` (last key `K`).
///
/// - archive rows before `K` are kept as they are;
/// - fresh rows before `K` are dropped;
/// - a fresh row at exactly `K` replaces the archived one, since the last
///   archived minute may have been partial when it was stored;
/// - fresh rows after `K` are appended.
///
/// If the fresh side starts later than one period after `K` the junction is
/// bridged with flat candles so the result stays gap-free.
pub fn merge_series(archive: Series, fresh: Series, period: i64) -> Result<Series> {
    check_period(period)?;
    let boundary = match archive.last_key() {
        Some(key) => key,
        None => return Ok(fresh),
    };
    if fresh.is_empty() {
        return Ok(archive);
    }

    let retained: Vec<_> = fresh
        .into_candles()
        .into_iter()
        .filter(|c| c.open_time >= boundary)
        .collect();
    let replaces_boundary = retained.first().map(|c| c.open_time) == Some(boundary);

    debug!(
        "boundary {}: {} fresh rows retained, boundary row {}",
        boundary,
        retained.len(),
        if replaces_boundary { "replaced" } else { "kept" }
    );

    let mut merged = archive.into_candles();
    if replaces_boundary {
        merged.pop();
    } else if let (Some(&last), Some(&next)) = (merged.last(), retained.first()) {
        let junction = fill_gaps(Series::from_sorted(vec![last, next]), period)?.into_candles();
        merged.extend_from_slice(&junction[1..junction.len() - 1]);
    }
    merged.extend(retained);

    Ok(Series::from_sorted(merged))
}

/// Merges `fresh` into whatever `archive` holds and optionally persists the result.
///
/// Without an archive, or when nothing has been stored yet, `fresh` passes
/// through unchanged (and becomes the archive when `archive_update` is set).
/// An archive that exists but cannot be read is an error: merging against it
/// and writing back would silently drop history.
pub fn merge_with_archive<A: Store>(
    fresh: Series,
    archive: Option<&A>,
    archive_update: bool,
    period: i64,
) -> Result<Series> {
    check_period(period)?;
    let archive = match archive {
        Some(archive) => archive,
        None => return Ok(fresh),
    };

    let merged = if archive.exists() {
        let stored = archive.read()?;
        merge_series(stored, fresh, period)?
    } else {
        info!("no archive yet, starting one from {} fresh rows", fresh.len());
        fresh
    };

    if archive_update {
        archive.write(&merged)?;
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::CsvArchive;
    use crate::error::OhlcvError;
    use crate::models::Candle;
    use chrono::{DateTime, FixedOffset, TimeZone};
    use std::fs;
    use tempfile::tempdir;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    // minutes after 2021-01-01 09:00 JST
    fn at(minute: i64) -> DateTime<FixedOffset> {
        jst().timestamp_opt(1609459200 + minute * 60, 0).unwrap()
    }

    fn series(rows: &[(i64, f64)]) -> Series {
        Series::new(
            rows.iter()
                .map(|&(m, price)| Candle {
                    open_time: at(m),
                    open: price,
                    high: price + 1.0,
                    low: price - 1.0,
                    close: price,
                    volume: 1.0,
                    quote_volume: price,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn boundary_row_is_replaced_not_duplicated() {
        let archive = series(&[(0, 1.0), (1, 2.0), (2, 3.0)]);
        let fresh = series(&[(2, 3.5), (3, 4.0), (4, 5.0)]);

        let merged = merge_series(archive, fresh, 60).unwrap();

        assert_eq!(
            merged,
            series(&[(0, 1.0), (1, 2.0), (2, 3.5), (3, 4.0), (4, 5.0)])
        );
    }

    #[test]
    fn fresh_rows_before_boundary_are_dropped() {
        let archive = series(&[(0, 1.0), (1, 2.0), (2, 3.0)]);
        let fresh = series(&[(0, 9.0), (1, 9.0), (2, 3.5), (3, 4.0)]);

        let merged = merge_series(archive, fresh, 60).unwrap();

        assert_eq!(merged, series(&[(0, 1.0), (1, 2.0), (2, 3.5), (3, 4.0)]));
    }

    #[test]
    fn fresh_entirely_before_boundary_leaves_archive() {
        let archive = series(&[(5, 1.0), (6, 2.0)]);
        let fresh = series(&[(1, 9.0), (2, 9.0)]);

        assert_eq!(merge_series(archive.clone(), fresh, 60).unwrap(), archive);
    }

    #[test]
    fn empty_sides() {
        let archive = series(&[(0, 1.0), (1, 2.0)]);
        let fresh = series(&[(1, 2.5), (2, 3.0)]);

        assert_eq!(
            merge_series(archive.clone(), Series::empty(), 60).unwrap(),
            archive
        );
        assert_eq!(
            merge_series(Series::empty(), fresh.clone(), 60).unwrap(),
            fresh
        );
    }

    #[test]
    fn junction_gap_is_bridged_with_flat_candles() {
        let archive = series(&[(0, 1.0), (1, 2.0)]);
        let fresh = series(&[(4, 5.0), (5, 6.0)]);

        let merged = merge_series(archive, fresh, 60).unwrap();

        assert_eq!(merged.len(), 6);
        assert_eq!(merged.candle_at(at(2)), Some(&Candle::flat(at(2), 2.0)));
        assert_eq!(merged.candle_at(at(3)), Some(&Candle::flat(at(3), 2.0)));
        assert_eq!(merged.candle_at(at(4)).map(|c| c.close), Some(5.0));
    }

    #[test]
    fn at_most_one_row_at_boundary_and_nothing_older_from_fresh() {
        let archive = series(&[(10, 1.0), (11, 2.0), (12, 3.0)]);
        for start in 0..15 {
            let fresh = series(&(start..start + 5).map(|m| (m, 100.0)).collect::<Vec<_>>());

            let merged = merge_series(archive.clone(), fresh, 60).unwrap();

            assert!(merged
                .candles()
                .windows(2)
                .all(|pair| pair[0].open_time < pair[1].open_time));
            for c in merged.iter().filter(|c| c.open_time < at(12)) {
                assert_ne!(c.close, 100.0);
            }
            assert_eq!(merged.iter().filter(|c| c.open_time == at(12)).count(), 1);
        }
    }

    #[test]
    fn non_positive_period_is_rejected() {
        let archive = series(&[(0, 1.0)]);
        let fresh = series(&[(3, 2.0)]);

        for period in [0, -60] {
            assert!(matches!(
                merge_series(archive.clone(), fresh.clone(), period),
                Err(OhlcvError::InvalidPeriod(p)) if p == period
            ));
        }
    }

    #[test]
    fn no_archive_passes_fresh_through() {
        let fresh = series(&[(0, 1.0)]);

        let merged = merge_with_archive::<CsvArchive>(fresh.clone(), None, true, 60).unwrap();

        assert_eq!(merged, fresh);
    }

    #[test]
    fn absent_archive_is_created_only_on_update() {
        let dir = tempdir().unwrap();
        let archive = CsvArchive::new(dir.path().join("ohlcv.csv"), jst());
        let fresh = series(&[(0, 1.0), (1, 2.0)]);

        let merged = merge_with_archive(fresh.clone(), Some(&archive), false, 60).unwrap();
        assert_eq!(merged, fresh);
        assert!(!archive.exists());

        let merged = merge_with_archive(fresh.clone(), Some(&archive), true, 60).unwrap();
        assert_eq!(merged, fresh);
        assert_eq!(archive.read().unwrap(), fresh);
    }

    #[test]
    fn merge_then_empty_merge_is_idempotent() {
        let dir = tempdir().unwrap();
        let archive = CsvArchive::new(dir.path().join("ohlcv.csv"), jst());
        archive.write(&series(&[(0, 1.0), (1, 2.0), (2, 3.0)])).unwrap();

        let first = merge_with_archive(
            series(&[(2, 3.5), (3, 4.0), (4, 5.0)]),
            Some(&archive),
            true,
            60,
        )
        .unwrap();
        let second = merge_with_archive(Series::empty(), Some(&archive), true, 60).unwrap();

        assert_eq!(first, second);
        assert_eq!(archive.read().unwrap(), first);
    }

    #[test]
    fn merge_without_update_leaves_archive_untouched() {
        let dir = tempdir().unwrap();
        let archive = CsvArchive::new(dir.path().join("ohlcv.csv"), jst());
        let stored = series(&[(0, 1.0), (1, 2.0)]);
        archive.write(&stored).unwrap();

        let merged =
            merge_with_archive(series(&[(1, 2.5), (2, 3.0)]), Some(&archive), false, 60).unwrap();

        assert_eq!(merged.len(), 3);
        assert_eq!(archive.read().unwrap(), stored);
    }

    #[test]
    fn corrupt_archive_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ohlcv.csv");
        fs::write(&path, "this is not an archive\n").unwrap();
        let archive = CsvArchive::new(&path, jst());

        let res = merge_with_archive(series(&[(0, 1.0)]), Some(&archive), true, 60);

        assert!(matches!(res, Err(OhlcvError::ArchiveRead { .. })));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "this is not an archive\n"
        );
    }
}
