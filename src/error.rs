use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

/// Every failure the fetch / normalize / merge pipeline can surface.
///
/// An archive that simply does not exist yet is not represented here: callers
/// check [`crate::archive::Store::exists`] and treat absence as a normal
/// pass-through.
#[derive(Debug, Error)]
pub enum OhlcvError {
    /// Transport-level failure talking to the quote service.
    #[error("request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The quote service answered with a non-success status.
    #[error("request for {pair} not successful: {status}")]
    Status {
        pair: String,
        status: reqwest::StatusCode,
    },

    /// The JSON document does not have the `result` / period / row shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// An archive exists but cannot be read back as a valid series.
    #[error("cannot read archive {}: {reason}", .path.display())]
    ArchiveRead { path: PathBuf, reason: String },

    #[error("cannot write archive {}: {source}", .path.display())]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot cache {}: {reason}", .path.display())]
    Cache { path: PathBuf, reason: String },

    /// A key that does not sit on the one-minute grid of its series.
    #[error("candle at {key} is not aligned to the period grid")]
    Misaligned { key: DateTime<FixedOffset> },

    /// Candle periods are a positive number of seconds.
    #[error("invalid period: {0}s")]
    InvalidPeriod(i64),

    /// Keys must be strictly increasing inside a series.
    #[error("series key {key} is not strictly increasing")]
    UnorderedSeries { key: DateTime<FixedOffset> },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, OhlcvError>;
