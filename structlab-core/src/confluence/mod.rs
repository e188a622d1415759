//! Confluence scorer: nine boolean flags per bar, folded into a primary
//! (structural) and secondary (contextual) score.
//!
//! Scoring is two-step: [`ScoringContext::new`] precomputes every trailing
//! series once, then [`ScoringContext::score_bar`] reads them for one index.
//! `score_bar` holds no state, so scoring the same bar twice gives the same
//! vector.
//!
//! Every input to the flags at bar `i` comes from bars `0..=i`, with one
//! exception: if no bar in the whole series clears the liquidity quantile,
//! the quantile is recomputed once at a lower percentile for the whole
//! series. That decision looks at every bar and is reported on
//! [`ConfluenceSeries::liquidity_fallback`].

pub mod gating;
pub mod params;

pub use gating::{Candidate, EntryFilter, HtfRegime};
pub use params::{
    ConfluenceParams, RegimeSource, StructurePolicy, StructureTiming, CONFLUENCE_MODEL_VERSION,
};

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, BarSeries, Bias, StructureEvent, SwingKind, SwingPoint};
use crate::indicators::ema::ema_of_series;
use crate::indicators::{rolling_max, rolling_mean, rolling_min, rolling_quantile};
use crate::patterns::PatternCode;
use crate::structure::StructureOutput;

/// Per-bar confluence flags and scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfluenceVector {
    // ── Primary ──
    pub conf_structure: bool,
    pub conf_bos_or_choch: bool,
    pub conf_candle: bool,
    pub conf_sr_zone: bool,
    // ── Secondary ──
    pub conf_psych_level: bool,
    pub conf_fib_zone: bool,
    pub conf_volume: bool,
    pub conf_liquidity: bool,
    pub conf_spread: bool,

    pub primary_score: u8,
    pub secondary_score: u8,
}

impl ConfluenceVector {
    /// Build from the flags, deriving both scores.
    #[allow(clippy::too_many_arguments)]
    pub fn from_flags(
        conf_structure: bool,
        conf_bos_or_choch: bool,
        conf_candle: bool,
        conf_sr_zone: bool,
        conf_psych_level: bool,
        conf_fib_zone: bool,
        conf_volume: bool,
        conf_liquidity: bool,
        conf_spread: bool,
    ) -> Self {
        let count = |flags: &[bool]| flags.iter().filter(|f| **f).count() as u8;
        Self {
            conf_structure,
            conf_bos_or_choch,
            conf_candle,
            conf_sr_zone,
            conf_psych_level,
            conf_fib_zone,
            conf_volume,
            conf_liquidity,
            conf_spread,
            primary_score: count(&[conf_structure, conf_bos_or_choch, conf_candle, conf_sr_zone]),
            secondary_score: count(&[
                conf_psych_level,
                conf_fib_zone,
                conf_volume,
                conf_liquidity,
                conf_spread,
            ]),
        }
    }

    pub fn num_confs(&self) -> u8 {
        self.primary_score + self.secondary_score
    }

    pub fn setup_grade(&self) -> SetupGrade {
        SetupGrade::from_primary(self.primary_score)
    }
}

/// Setup quality by primary score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SetupGrade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
}

impl SetupGrade {
    pub fn from_primary(primary_score: u8) -> Self {
        match primary_score {
            0 | 1 => SetupGrade::C,
            2 => SetupGrade::B,
            3 => SetupGrade::A,
            _ => SetupGrade::APlus,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SetupGrade::APlus => "A+",
            SetupGrade::A => "A",
            SetupGrade::B => "B",
            SetupGrade::C => "C",
        }
    }
}

/// Scorer output for a whole series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceSeries {
    pub vectors: Vec<ConfluenceVector>,
    /// Regime bias per bar, from the configured [`RegimeSource`].
    pub regime: Vec<Bias>,
    /// True when the global liquidity relaxation kicked in.
    pub liquidity_fallback: bool,
}

/// A swing together with the bar at which the scorer may see it.
#[derive(Debug, Clone, Copy)]
struct KnownSwing {
    known_at: usize,
    swing: SwingPoint,
}

/// Precomputed trailing series for one scoring pass.
#[derive(Debug, Clone)]
pub struct ScoringContext<'a> {
    bars: &'a [Bar],
    patterns: &'a [PatternCode],
    params: &'a ConfluenceParams,
    events: Vec<StructureEvent>,
    trend: Vec<Bias>,
    swings: Vec<KnownSwing>,
    sr_high: Vec<f64>,
    sr_low: Vec<f64>,
    volume_mean: Vec<f64>,
    liquidity_threshold: Vec<f64>,
    liquidity_fallback: bool,
    spread_mean: Vec<f64>,
}

impl<'a> ScoringContext<'a> {
    pub fn new(
        series: &'a BarSeries,
        structure: &StructureOutput,
        patterns: &'a [PatternCode],
        params: &'a ConfluenceParams,
    ) -> Self {
        let bars = series.bars();
        let n = bars.len();
        let shift = visibility_shift(structure, params);

        // ── Structure, re-stamped at the bar it becomes visible ──
        let events = (0..n)
            .map(|i| i.checked_sub(shift).map_or(StructureEvent::NONE, |j| structure.event_at(j)))
            .collect();
        let trend = visible_trend(structure, shift, n);
        let swings = structure
            .swings
            .iter()
            .map(|s| KnownSwing {
                known_at: s.index + shift,
                swing: *s,
            })
            .collect();

        // ── Trailing windows ──
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let spreads: Vec<f64> = bars.iter().map(|b| b.spread.unwrap_or(f64::NAN)).collect();

        let sr_high = rolling_max(&highs, params.sr_lookback + 1);
        let sr_low = rolling_min(&lows, params.sr_lookback + 1);
        let volume_mean = rolling_mean(&volumes, params.volume_window);
        let spread_mean = rolling_mean(&spreads, params.spread_window);

        let mut liquidity_threshold =
            rolling_quantile(&volumes, params.liquidity_window, params.liquidity_percentile);
        let mut liquidity_fallback = false;
        let any_liquid = volumes
            .iter()
            .zip(&liquidity_threshold)
            .any(|(v, t)| v > t);
        if n > 0 && !any_liquid {
            tracing::warn!(
                bars = n,
                percentile = params.liquidity_percentile,
                fallback = params.liquidity_fallback_percentile,
                "no bar cleared the liquidity quantile; relaxing percentile for the whole series"
            );
            liquidity_threshold = rolling_quantile(
                &volumes,
                params.liquidity_window,
                params.liquidity_fallback_percentile,
            );
            liquidity_fallback = true;
        }

        Self {
            bars,
            patterns,
            params,
            events,
            trend,
            swings,
            sr_high,
            sr_low,
            volume_mean,
            liquidity_threshold,
            liquidity_fallback,
            spread_mean,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn liquidity_fallback(&self) -> bool {
        self.liquidity_fallback
    }

    /// Structure event as visible at bar `i`.
    pub fn event_at(&self, i: usize) -> StructureEvent {
        self.events.get(i).copied().unwrap_or_default()
    }

    /// Trend bias as visible at bar `i`.
    pub fn trend_at(&self, i: usize) -> Option<Bias> {
        self.trend.get(i).copied()
    }

    /// Swings that became visible in `[from, to]`.
    fn swings_known_between(&self, from: usize, to: usize) -> &[KnownSwing] {
        let start = self.swings.partition_point(|s| s.known_at < from);
        let end = self.swings.partition_point(|s| s.known_at <= to);
        &self.swings[start..end.max(start)]
    }

    /// Score bar `i`. Panics if `i` is out of range.
    pub fn score_bar(&self, i: usize) -> ConfluenceVector {
        let p = self.params;
        let bar = &self.bars[i];
        let close = bar.close;

        let event = self.event_at(i);
        let recent = self.swings_known_between(i.saturating_sub(p.structure_lookback), i);
        let conf_structure = !recent.is_empty()
            && match p.structure_policy {
                StructurePolicy::Strict => event.is_some(),
                StructurePolicy::Loose => true,
            };
        let conf_bos_or_choch = event.is_some();
        let conf_candle = self.patterns.get(i).is_some_and(|c| c.is_pattern());

        let near = |level: f64| (close - level).abs() / close < p.sr_threshold;
        let conf_sr_zone = near(self.sr_high[i]) || near(self.sr_low[i]);

        let conf_psych_level = p.psych_levels.iter().any(|&level| {
            let r = close.rem_euclid(level);
            r < p.psych_tolerance || r > level - p.psych_tolerance
        });

        let conf_fib_zone = self.fib_zone(i, close);

        let conf_volume = bar.volume > self.volume_mean[i];
        let conf_liquidity = bar.volume > self.liquidity_threshold[i];
        let conf_spread = match bar.spread {
            None => true,
            Some(s) => s < self.spread_mean[i],
        };

        ConfluenceVector::from_flags(
            conf_structure,
            conf_bos_or_choch,
            conf_candle,
            conf_sr_zone,
            conf_psych_level,
            conf_fib_zone,
            conf_volume,
            conf_liquidity,
            conf_spread,
        )
    }

    fn fib_zone(&self, i: usize, close: f64) -> bool {
        let p = self.params;
        let window = self.swings_known_between(i.saturating_sub(p.sr_lookback), i);
        // Most recent visible pair, not the window extremes
        let latest = |kind: SwingKind| {
            window
                .iter()
                .rev()
                .find(|k| k.swing.kind == kind)
                .map(|k| k.swing.price)
        };

        let (Some(high), Some(low)) = (latest(SwingKind::High), latest(SwingKind::Low)) else {
            return false;
        };
        let diff = high - low;
        p.fib_levels
            .iter()
            .map(|f| low + f * diff)
            .any(|level| (close - level).abs() / close < p.fib_tolerance)
    }

    /// Regime bias per bar.
    pub fn regime(&self) -> Vec<Bias> {
        match self.params.regime_source {
            RegimeSource::Structure => self.trend.clone(),
            RegimeSource::EmaCross { fast, slow } => ema_regime(self.bars, fast, slow),
        }
    }
}

fn visibility_shift(structure: &StructureOutput, params: &ConfluenceParams) -> usize {
    match params.structure_timing {
        StructureTiming::AtConfirmation => structure.params.swing_window,
        StructureTiming::AtSwing => 0,
    }
}

fn visible_trend(structure: &StructureOutput, shift: usize, n: usize) -> Vec<Bias> {
    (0..n)
        .map(|i| {
            i.checked_sub(shift)
                .and_then(|j| structure.trend.get(j).copied())
                .unwrap_or(structure.params.initial_bias)
        })
        .collect()
}

fn ema_regime(bars: &[Bar], fast: usize, slow: usize) -> Vec<Bias> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let fast = ema_of_series(&closes, fast);
    let slow = ema_of_series(&closes, slow);
    fast.iter()
        .zip(&slow)
        .map(|(f, s)| if f > s { Bias::Bull } else { Bias::Bear })
        .collect()
}

/// Regime bias per bar without scoring. Used to build higher-timeframe
/// regimes before the lower timeframes are scored.
pub fn regime_series(
    series: &BarSeries,
    structure: &StructureOutput,
    params: &ConfluenceParams,
) -> Vec<Bias> {
    match params.regime_source {
        RegimeSource::Structure => {
            visible_trend(structure, visibility_shift(structure, params), series.len())
        }
        RegimeSource::EmaCross { fast, slow } => ema_regime(series.bars(), fast, slow),
    }
}

/// Score every bar of a series.
pub fn score(
    series: &BarSeries,
    structure: &StructureOutput,
    patterns: &[PatternCode],
    params: &ConfluenceParams,
) -> ConfluenceSeries {
    let ctx = ScoringContext::new(series, structure, patterns, params);
    let vectors: Vec<ConfluenceVector> = (0..ctx.len()).map(|i| ctx.score_bar(i)).collect();

    tracing::debug!(
        bars = vectors.len(),
        a_plus = vectors.iter().filter(|v| v.primary_score == 4).count(),
        liquidity_fallback = ctx.liquidity_fallback(),
        "confluence scored"
    );

    ConfluenceSeries {
        regime: ctx.regime(),
        liquidity_fallback: ctx.liquidity_fallback(),
        vectors,
    }
}

/// Score a single bar.
///
/// Builds a fresh context each call; use [`score`] or a shared
/// [`ScoringContext`] when scoring many bars.
pub fn score_bar(
    series: &BarSeries,
    structure: &StructureOutput,
    patterns: &[PatternCode],
    params: &ConfluenceParams,
    index: usize,
) -> ConfluenceVector {
    ScoringContext::new(series, structure, patterns, params).score_bar(index)
}
