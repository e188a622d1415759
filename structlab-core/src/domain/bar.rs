//! Bar: the fundamental market data unit, and the validated series it lives in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// OHLCV bar for one instrument on one timeframe.
///
/// `timestamp` is the bar's open time in UTC. `spread` is optional: brokers
/// that do not report it leave it `None` and spread-based confluence degrades
/// to its documented default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub spread: Option<f64>,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }
}

/// A time-ordered bar sequence.
///
/// Construction is the only place ordering is checked: every component in the
/// crate takes a `BarSeries` (or a slice borrowed from one) and relies on
/// strictly increasing timestamps without re-checking.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Validate ordering and wrap the bars.
    ///
    /// Fails with `InvalidTimestampOrdering` at the first bar whose timestamp
    /// is not strictly greater than its predecessor's (duplicates included).
    pub fn new(bars: Vec<Bar>) -> Result<Self, CoreError> {
        for (i, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(CoreError::InvalidTimestampOrdering {
                    index: i + 1,
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Prefix of the series (bars `0..len`). Always valid: a prefix of an
    /// ordered series is ordered.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            bars: self.bars[..len.min(self.bars.len())].to_vec(),
        }
    }

    /// Whether every bar carries a spread value.
    pub fn has_spread(&self) -> bool {
        !self.bars.is_empty() && self.bars.iter().all(|b| b.spread.is_some())
    }

    pub fn into_inner(self) -> Vec<Bar> {
        self.bars
    }
}

impl std::ops::Index<usize> for BarSeries {
    type Output = Bar;

    fn index(&self, index: usize) -> &Bar {
        &self.bars[index]
    }
}
