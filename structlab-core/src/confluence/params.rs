//! Confluence parameters and per-timeframe presets.

use serde::{Deserialize, Serialize};

use crate::domain::Timeframe;
use crate::error::CoreError;

/// Bumped whenever a flag definition changes meaning. Part of the profile
/// fingerprint, so results from different models never compare equal.
pub const CONFLUENCE_MODEL_VERSION: u32 = 2;

/// How `conf_structure` is decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructurePolicy {
    /// Recent swing AND a BOS/CHoCH at this bar.
    #[default]
    Strict,
    /// Recent swing alone.
    Loose,
}

/// Which bar structure output is attributed to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureTiming {
    /// Shift swings, events and trend to the bar at which the swing is
    /// confirmed (`index + swing_window`). Causal.
    #[default]
    AtConfirmation,
    /// Use the swing bar itself. Reads `swing_window` bars ahead; research only.
    AtSwing,
}

/// Where the per-bar regime bias comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegimeSource {
    /// Trend bias from the structure detector.
    #[default]
    Structure,
    /// Bull iff EMA(fast) > EMA(slow) on close.
    EmaCross { fast: usize, slow: usize },
}

impl RegimeSource {
    /// Fast/slow EMA pair for the EMA-cross regime source.
    pub fn ema_for_timeframe(tf: Timeframe) -> Self {
        let (fast, slow) = match tf {
            Timeframe::M5 => (13, 34),
            Timeframe::M15 => (21, 50),
            Timeframe::H1 => (21, 100),
            Timeframe::H4 => (50, 200),
            Timeframe::D1 => (100, 200),
        };
        RegimeSource::EmaCross { fast, slow }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceParams {
    pub sr_lookback: usize,
    /// Relative distance to the window high/low that counts as "at" it.
    pub sr_threshold: f64,
    pub psych_levels: Vec<f64>,
    /// Absolute price distance to a psych level multiple.
    pub psych_tolerance: f64,
    pub fib_levels: Vec<f64>,
    pub fib_tolerance: f64,
    pub volume_window: usize,
    pub liquidity_window: usize,
    pub liquidity_percentile: f64,
    pub liquidity_fallback_percentile: f64,
    pub spread_window: usize,
    pub structure_policy: StructurePolicy,
    pub structure_lookback: usize,
    pub structure_timing: StructureTiming,
    pub regime_source: RegimeSource,
}

impl ConfluenceParams {
    pub fn for_timeframe(tf: Timeframe) -> Self {
        let (sr_lookback, sr_threshold, psych_tolerance, liquidity_percentile, structure_lookback) =
            match tf {
                Timeframe::M5 => (10, 0.0015, 1.5, 0.70, 3),
                Timeframe::M15 => (20, 0.0015, 2.0, 0.70, 4),
                Timeframe::H1 => (30, 0.001, 2.0, 0.65, 5),
                Timeframe::H4 => (50, 0.001, 2.5, 0.60, 7),
                Timeframe::D1 => (100, 0.001, 3.0, 0.60, 10),
            };
        Self {
            sr_lookback,
            sr_threshold,
            psych_levels: vec![50.0, 100.0, 250.0],
            psych_tolerance,
            fib_levels: vec![0.382, 0.5, 0.618],
            fib_tolerance: 0.01,
            volume_window: 20,
            liquidity_window: 100,
            liquidity_percentile,
            liquidity_fallback_percentile: 0.50,
            spread_window: 20,
            structure_policy: StructurePolicy::Strict,
            structure_lookback,
            structure_timing: StructureTiming::AtConfirmation,
            regime_source: RegimeSource::Structure,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let windows = [
            ("sr_lookback", self.sr_lookback),
            ("volume_window", self.volume_window),
            ("liquidity_window", self.liquidity_window),
            ("spread_window", self.spread_window),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(CoreError::InvalidParams(format!("{name} must be >= 1")));
            }
        }
        for (name, q) in [
            ("liquidity_percentile", self.liquidity_percentile),
            ("liquidity_fallback_percentile", self.liquidity_fallback_percentile),
        ] {
            if !(0.0..=1.0).contains(&q) {
                return Err(CoreError::InvalidParams(format!("{name} must be in [0, 1], got {q}")));
            }
        }
        if self.psych_levels.iter().any(|l| !(l.is_finite() && *l > 0.0)) {
            return Err(CoreError::InvalidParams("psych_levels must be positive".into()));
        }
        if let RegimeSource::EmaCross { fast, slow } = self.regime_source {
            if fast == 0 || fast >= slow {
                return Err(CoreError::InvalidParams(format!(
                    "ema cross needs 0 < fast < slow, got {fast}/{slow}"
                )));
            }
        }
        Ok(())
    }
}
