use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{OhlcvError, Result};
use crate::models::{Candle, Series};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";
const HEADER: [&str; 7] = [
    "OpenTime",
    "Open",
    "High",
    "Low",
    "Close",
    "Volume",
    "QuoteVolume",
];

/// Durable home of a series.
pub trait Store {
    fn exists(&self) -> bool;
    /// Fails if nothing is stored or the content is not a valid series.
    fn read(&self) -> Result<Series>;
    /// Replaces the stored content in full.
    fn write(&self, series: &Series) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveRecord {
    #[serde(rename = "OpenTime")]
    open_time: String,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    volume: f64,
    #[serde(rename = "QuoteVolume")]
    quote_volume: f64,
}

impl From<&Candle> for ArchiveRecord {
    fn from(c: &Candle) -> ArchiveRecord {
        ArchiveRecord {
            open_time: c.open_time.format(TIME_FORMAT).to_string(),
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            quote_volume: c.quote_volume,
        }
    }
}

/// The canonical textual archive: one CSV file per pair.
#[derive(Clone, Debug)]
pub struct CsvArchive {
    path: PathBuf,
    tz: FixedOffset,
}

impl CsvArchive {
    pub fn new(path: impl Into<PathBuf>, tz: FixedOffset) -> CsvArchive {
        CsvArchive {
            path: path.into(),
            tz,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_error(&self, reason: impl ToString) -> OhlcvError {
        OhlcvError::ArchiveRead {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn write_error(&self, source: std::io::Error) -> OhlcvError {
        OhlcvError::ArchiveWrite {
            path: self.path.clone(),
            source,
        }
    }

    fn parse_time(&self, raw: &str) -> Result<DateTime<FixedOffset>> {
        DateTime::parse_from_str(raw, TIME_FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .map(|t| t.with_timezone(&self.tz))
            .map_err(|e| self.read_error(format!("bad OpenTime `{}`: {}", raw, e)))
    }
}

impl Store for CsvArchive {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read(&self) -> Result<Series> {
        let file = File::open(&self.path).map_err(|e| self.read_error(e))?;
        let mut reader = csv::Reader::from_reader(BufReader::new(file));

        let headers = reader.headers().map_err(|e| self.read_error(e))?;
        if headers.iter().ne(HEADER.iter().copied()) {
            return Err(self.read_error(format!("unexpected header {:?}", headers)));
        }

        let mut candles = vec![];
        for record in reader.deserialize::<ArchiveRecord>() {
            let record = record.map_err(|e| self.read_error(e))?;
            candles.push(Candle {
                open_time: self.parse_time(&record.open_time)?,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
                quote_volume: record.quote_volume,
            });
        }

        let series = Series::new(candles).map_err(|e| self.read_error(e))?;
        debug!("read {} rows from {}", series.len(), self.path.display());
        Ok(series)
    }

    fn write(&self, series: &Series) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.write_error(e))?;
        }

        // written beside the target, then renamed over it
        let tmp = self.path.with_extension("csv.tmp");
        if let Err(e) = write_records(&tmp, series).and_then(|_| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(self.write_error(e));
        }

        info!("wrote {} rows to {}", series.len(), self.path.display());
        Ok(())
    }
}

fn write_records(path: &Path, series: &Series) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    if series.is_empty() {
        writer.write_record(HEADER)?;
    }
    for candle in series {
        writer.serialize(ArchiveRecord::from(candle))?;
    }
    writer.flush()
}

/// Fast binary tier holding a fully resolved series. Never expires.
#[derive(Clone, Debug)]
pub struct SnapshotCache {
    path: PathBuf,
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>) -> SnapshotCache {
        SnapshotCache { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cache_error(&self, reason: impl ToString) -> OhlcvError {
        OhlcvError::Cache {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Store for SnapshotCache {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read(&self) -> Result<Series> {
        let file = File::open(&self.path).map_err(|e| self.cache_error(e))?;
        let candles: Vec<Candle> =
            bincode::deserialize_from(BufReader::new(file)).map_err(|e| self.cache_error(e))?;
        Series::new(candles).map_err(|e| self.cache_error(e))
    }

    fn write(&self, series: &Series) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.cache_error(e))?;
        }
        let file = File::create(&self.path).map_err(|e| self.cache_error(e))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, series.candles()).map_err(|e| self.cache_error(e))?;
        writer.flush().map_err(|e| self.cache_error(e))?;
        debug!("cached {} rows at {}", series.len(), self.path.display());
        Ok(())
    }
}
