//! Timeframe profile: every tunable of the pipeline in one value.
//!
//! `Profile::for_timeframe` gives the calibrated presets; callers override
//! individual fields (usually from TOML) and call [`Profile::validate`] once
//! before running.

use serde::{Deserialize, Serialize};

use crate::confluence::{ConfluenceParams, EntryFilter};
use crate::domain::Timeframe;
use crate::error::CoreError;
use crate::indicators::AtrSmoothing;
use crate::patterns::CandleThresholds;
use crate::risk::RiskConfig;
use crate::simulator::SimConfig;
use crate::structure::SwingParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub timeframe: Timeframe,
    pub swing: SwingParams,
    pub candles: CandleThresholds,
    pub confluence: ConfluenceParams,
    pub entry: EntryFilter,
    pub atr_period: usize,
    #[serde(default)]
    pub atr_smoothing: AtrSmoothing,
    pub risk: RiskConfig,
    pub sim: SimConfig,
}

impl Profile {
    pub fn for_timeframe(tf: Timeframe) -> Self {
        let swing = SwingParams::for_timeframe(tf);
        let mut confluence = ConfluenceParams::for_timeframe(tf);
        confluence.structure_lookback = swing.swing_window;
        let risk = RiskConfig::default();
        Self {
            timeframe: tf,
            swing,
            candles: CandleThresholds::for_timeframe(tf),
            confluence,
            entry: EntryFilter::for_timeframe(tf),
            atr_period: 14,
            atr_smoothing: AtrSmoothing::Simple,
            sim: SimConfig::from_risk(&risk),
            risk,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        self.swing.validate()?;
        self.confluence.validate()?;
        self.risk.validate()?;
        self.sim.validate()?;
        if self.atr_period == 0 {
            return Err(CoreError::InvalidParams("atr_period must be >= 1".into()));
        }
        if self.entry.min_primary > 4 {
            return Err(CoreError::InvalidParams(format!(
                "entry.min_primary {} can never be met (max 4)",
                self.entry.min_primary
            )));
        }
        if (self.sim.pip_size - self.risk.pip_size).abs() > f64::EPSILON
            || (self.sim.pip_value - self.risk.pip_value).abs() > f64::EPSILON
        {
            return Err(CoreError::InvalidParams(
                "sim and risk must agree on pip_size and pip_value".into(),
            ));
        }
        Ok(())
    }
}
