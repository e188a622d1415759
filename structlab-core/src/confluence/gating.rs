//! Entry gating: which scored bars become candidate signals.
//!
//! A bar passes when its scores meet the timeframe minimums and, if a
//! higher-timeframe regime is supplied, its bias agrees with the HTF bias
//! known at that instant.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ConfluenceSeries, ConfluenceVector};
use crate::domain::{BarSeries, Bias, Side, Timeframe};

/// Score minimums for a candidate signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFilter {
    pub min_primary: u8,
    #[serde(default)]
    pub min_secondary: Option<u8>,
    #[serde(default)]
    pub min_confs: Option<u8>,
    /// Only consulted when a [`HtfRegime`] is supplied.
    #[serde(default = "default_true")]
    pub require_regime_match: bool,
}

fn default_true() -> bool {
    true
}

impl EntryFilter {
    pub fn for_timeframe(tf: Timeframe) -> Self {
        Self {
            min_primary: if tf == Timeframe::M5 { 2 } else { 3 },
            min_secondary: None,
            min_confs: Some(3),
            require_regime_match: true,
        }
    }

    /// Score checks only.
    pub fn passes_scores(&self, v: &ConfluenceVector) -> bool {
        v.primary_score >= self.min_primary
            && self.min_secondary.map_or(true, |m| v.secondary_score >= m)
            && self.min_confs.map_or(true, |m| v.num_confs() >= m)
    }

    /// Full check for one bar. A bar older than every HTF entry has no HTF
    /// bias and fails the regime match.
    pub fn is_candidate(
        &self,
        v: &ConfluenceVector,
        bias: Bias,
        timestamp: DateTime<Utc>,
        htf: Option<&HtfRegime>,
    ) -> bool {
        if !self.passes_scores(v) {
            return false;
        }
        match htf {
            Some(htf) if self.require_regime_match => htf.bias_at(timestamp) == Some(bias),
            _ => true,
        }
    }

    /// Every candidate bar of a scored series, in index order.
    pub fn candidates(
        &self,
        series: &BarSeries,
        confluence: &ConfluenceSeries,
        htf: Option<&HtfRegime>,
    ) -> Vec<Candidate> {
        series
            .bars()
            .iter()
            .zip(confluence.vectors.iter().zip(&confluence.regime))
            .enumerate()
            .filter(|(_, (bar, (v, bias)))| self.is_candidate(v, **bias, bar.timestamp, htf))
            .map(|(index, (_, (v, bias)))| Candidate {
                index,
                side: Side::from_bias(*bias),
                bias: *bias,
                vector: *v,
            })
            .collect()
    }
}

/// A bar that passed gating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub index: usize,
    pub side: Side,
    pub bias: Bias,
    pub vector: ConfluenceVector,
}

/// Higher-timeframe bias keyed by the instant it became known.
///
/// Read-only once built; lookups take the latest entry at or before the
/// queried timestamp, so a lower-timeframe bar never sees an HTF bar that
/// has not closed yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HtfRegime {
    entries: BTreeMap<DateTime<Utc>, Bias>,
}

impl HtfRegime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, known_at: DateTime<Utc>, bias: Bias) {
        self.entries.insert(known_at, bias);
    }

    /// Build from an HTF series and its per-bar regime. Each bias becomes
    /// known when its bar closes (open + timeframe duration).
    pub fn from_series(series: &BarSeries, timeframe: Timeframe, regime: &[Bias]) -> Self {
        let step = timeframe.duration();
        Self {
            entries: series
                .bars()
                .iter()
                .zip(regime)
                .map(|(bar, bias)| (bar.timestamp + step, *bias))
                .collect(),
        }
    }

    pub fn bias_at(&self, timestamp: DateTime<Utc>) -> Option<Bias> {
        self.entries.range(..=timestamp).next_back().map(|(_, b)| *b)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(DateTime<Utc>, Bias)> for HtfRegime {
    fn from_iter<I: IntoIterator<Item = (DateTime<Utc>, Bias)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
