//! Structure detector: swings, trend bias and BOS/CHoCH per bar.
//!
//! Two passes:
//! 1. [`swings::extract_swings`] finds local extrema over a symmetric window.
//! 2. A [`trend::TrendMachine`] is folded over the bars, consuming the swings
//!    stamped at each index.
//!
//! The swing pass looks `swing_window` bars into the future, so a swing (and
//! any event it produces) is only observable `swing_window` bars after the
//! bar it is stamped on. This lag is deliberate; consumers that must stay
//! causal read events at the confirmation bar (see `confluence::StructureTiming`).

pub mod swings;
pub mod trend;

pub use swings::extract_swings;
pub use trend::TrendMachine;

use serde::{Deserialize, Serialize};

use crate::domain::{BarSeries, Bias, StructureEvent, SwingKind, SwingPoint, Timeframe};
use crate::error::CoreError;

/// Swing detection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingParams {
    /// Bars on each side that must not exceed the candidate extremum.
    pub swing_window: usize,
    /// Minimum spacing between two accepted swings of the same kind.
    pub min_swing_dist: usize,
    /// Bias before the first CHoCH.
    #[serde(default = "default_initial_bias")]
    pub initial_bias: Bias,
}

fn default_initial_bias() -> Bias {
    Bias::Bull
}

impl SwingParams {
    pub fn new(swing_window: usize, min_swing_dist: usize) -> Self {
        Self {
            swing_window,
            min_swing_dist,
            initial_bias: Bias::Bull,
        }
    }

    pub fn with_initial_bias(mut self, bias: Bias) -> Self {
        self.initial_bias = bias;
        self
    }

    /// Window and spacing tuned per timeframe: tighter on fast charts.
    pub fn for_timeframe(tf: Timeframe) -> Self {
        match tf {
            Timeframe::M5 => Self::new(3, 3),
            Timeframe::M15 => Self::new(4, 4),
            Timeframe::H1 => Self::new(5, 5),
            Timeframe::H4 => Self::new(7, 7),
            Timeframe::D1 => Self::new(10, 10),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.swing_window == 0 {
            return Err(CoreError::InvalidParams("swing_window must be >= 1".into()));
        }
        if self.min_swing_dist == 0 {
            return Err(CoreError::InvalidParams("min_swing_dist must be >= 1".into()));
        }
        Ok(())
    }

    /// Minimum series length for any swing to exist.
    pub fn min_bars(&self) -> usize {
        2 * self.swing_window + 1
    }
}

/// Everything the detector produces for one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureOutput {
    pub params: SwingParams,
    /// Swings in index order.
    pub swings: Vec<SwingPoint>,
    /// Bias per bar, always one per input bar.
    pub trend: Vec<Bias>,
    /// Event per bar; empty when the series is too short for any swing.
    pub events: Vec<StructureEvent>,
}

impl StructureOutput {
    /// Event stamped at `index`, or an empty event when out of range.
    pub fn event_at(&self, index: usize) -> StructureEvent {
        self.events.get(index).copied().unwrap_or_default()
    }

    pub fn bos_count(&self) -> usize {
        self.events.iter().filter(|e| e.bos.is_some()).count()
    }

    pub fn choch_count(&self) -> usize {
        self.events.iter().filter(|e| e.choch.is_some()).count()
    }

    pub fn swing_count(&self, kind: SwingKind) -> usize {
        self.swings.iter().filter(|s| s.kind == kind).count()
    }
}

/// Run both passes over a series.
pub fn detect(series: &BarSeries, params: &SwingParams) -> StructureOutput {
    let n = series.len();

    if n < params.min_bars() {
        return StructureOutput {
            params: *params,
            swings: Vec::new(),
            trend: vec![params.initial_bias; n],
            events: Vec::new(),
        };
    }

    let swings = extract_swings(series.bars(), params.swing_window, params.min_swing_dist);

    let mut machine = TrendMachine::new(params.initial_bias);
    let mut trend = Vec::with_capacity(n);
    let mut events = Vec::with_capacity(n);
    let mut cursor = 0;

    for i in 0..n {
        let start = cursor;
        while cursor < swings.len() && swings[cursor].index == i {
            cursor += 1;
        }
        events.push(machine.step(&swings[start..cursor]));
        trend.push(machine.bias);
    }

    tracing::debug!(
        bars = n,
        swings = swings.len(),
        bos = events.iter().filter(|e| e.bos.is_some()).count(),
        choch = events.iter().filter(|e| e.choch.is_some()).count(),
        "structure detected"
    );

    StructureOutput {
        params: *params,
        swings,
        trend,
        events,
    }
}
