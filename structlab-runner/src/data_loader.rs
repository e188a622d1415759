//! Bar loading for the runner.
//!
//! Two sources:
//! 1. CSV file with a header row → validated `BarSeries`
//! 2. Seeded random walk (`synthetic_series`) for development runs
//!
//! The CSV boundary is the only place raw rows are checked. Header names are
//! matched case-insensitively; `timestamp` may also be called `datetime` or
//! `time`, and `volume` may be called `tick_volume`. `spread` is optional.
//! Timestamps are RFC 3339, `%Y-%m-%d %H:%M:%S` (UTC), or integer epoch
//! seconds.
//!
//! Synthetic data is tagged on [`LoadedSeries::synthetic`] so results built
//! on it are never mistaken for real ones.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use structlab_core::domain::{Bar, BarSeries, Timeframe};
use structlab_core::fingerprint::DatasetHash;
use structlab_core::CoreError;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot parse {column} value '{value}'")]
    BadValue {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: inconsistent OHLC (open {open}, high {high}, low {low}, close {close})")]
    InsaneBar {
        row: usize,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("no bars in input")]
    Empty,

    #[error(transparent)]
    Series(#[from] CoreError),
}

/// A loaded series with provenance.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub timeframe: Timeframe,
    pub series: BarSeries,
    pub dataset_hash: DatasetHash,
    pub synthetic: bool,
}

impl LoadedSeries {
    fn new(timeframe: Timeframe, series: BarSeries, synthetic: bool) -> Self {
        Self {
            timeframe,
            dataset_hash: DatasetHash::of(&series),
            series,
            synthetic,
        }
    }
}

// ─── CSV ─────────────────────────────────────────────────────────────

/// Load a bar CSV from disk.
pub fn load_csv(path: &Path, timeframe: Timeframe) -> Result<LoadedSeries, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = read_bars(file)?;
    let series = BarSeries::new(bars)?;
    tracing::info!(
        path = %path.display(),
        timeframe = %timeframe,
        bars = series.len(),
        has_spread = series.has_spread(),
        "loaded bars"
    );
    Ok(LoadedSeries::new(timeframe, series, false))
}

struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    spread: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_ascii_lowercase()).collect();
        let find = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));
        let require = |column: &'static str, aliases: &[&str]| {
            find(aliases).ok_or(LoadError::MissingColumn(column))
        };
        Ok(Self {
            timestamp: require("timestamp", &["timestamp", "datetime", "time"])?,
            open: require("open", &["open"])?,
            high: require("high", &["high"])?,
            low: require("low", &["low"])?,
            close: require("close", &["close"])?,
            volume: require("volume", &["volume", "tick_volume"])?,
            spread: find(&["spread"]),
        })
    }
}

/// Parse bars from any CSV reader. Rows are returned in file order;
/// ordering is checked by `BarSeries::new`.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let columns = Columns::from_headers(rdr.headers()?)?;

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // Data rows are numbered from 1, after the header
        let row = i + 1;
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let number = |idx: usize, column: &'static str| {
            let raw = field(idx);
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| LoadError::BadValue {
                    row,
                    column,
                    value: raw.to_string(),
                })
        };

        let raw_ts = field(columns.timestamp);
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::BadValue {
            row,
            column: "timestamp",
            value: raw_ts.to_string(),
        })?;

        let spread = match columns.spread {
            Some(idx) if !field(idx).is_empty() => Some(number(idx, "spread")?),
            _ => None,
        };

        let bar = Bar {
            timestamp,
            open: number(columns.open, "open")?,
            high: number(columns.high, "high")?,
            low: number(columns.low, "low")?,
            close: number(columns.close, "close")?,
            volume: number(columns.volume, "volume")?,
            spread,
        };
        if !bar.is_sane() {
            return Err(LoadError::InsaneBar {
                row,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
            });
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(bars)
}

/// RFC 3339, `%Y-%m-%d %H:%M:%S` in UTC, or epoch seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

// ─── Synthetic ───────────────────────────────────────────────────────

/// Seeded random-walk bars around 2000, one `timeframe` apart.
///
/// Same `(n, timeframe, seed)` always gives the same bars.
pub fn synthetic_series(n: usize, timeframe: Timeframe, seed: u64) -> LoadedSeries {
    let mut rng = StdRng::seed_from_u64(seed ^ timeframe_salt(timeframe));
    let start = DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default(); // 2024-01-01
    let step = timeframe.duration();
    let scale = (step.num_minutes() as f64 / 5.0).sqrt();

    let mut price = 2000.0_f64;
    let mut drift = 0.0_f64;
    let bars = (0..n)
        .map(|i| {
            // Slowly changing drift produces trending legs and reversals
            if i % 40 == 0 {
                drift = rng.gen_range(-0.3..0.3);
            }
            let open = price;
            let close = (open + drift * scale + rng.gen_range(-1.5..1.5) * scale).max(1.0);
            let high = open.max(close) + rng.gen_range(0.0..1.0) * scale;
            let low = (open.min(close) - rng.gen_range(0.0..1.0) * scale).max(0.5);
            price = close;
            Bar {
                timestamp: start + step * i as i32,
                open,
                high,
                low,
                close,
                volume: rng.gen_range(200.0..2_000.0),
                spread: Some(rng.gen_range(0.15..0.45)),
            }
        })
        .collect();

    tracing::warn!(
        timeframe = %timeframe,
        bars = n,
        seed,
        "generated synthetic bars; results are tagged as synthetic"
    );
    // Timestamps are strictly increasing by construction
    LoadedSeries::new(timeframe, BarSeries::new(bars).unwrap_or_default(), true)
}

fn timeframe_salt(tf: Timeframe) -> u64 {
    let hash = blake3::hash(tf.as_str().as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}
