//! Lot sizing against a currency risk budget.

use super::RiskConfig;

/// Result of sizing one position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotSize {
    /// Lots actually taken.
    pub lots: f64,
    /// Lots the budget alone would buy, after flooring to the lot step.
    pub budget: f64,
    /// `min_lot` was forced above the budget.
    pub under_risk: bool,
}

/// Floor `value` to a multiple of `step`.
///
/// A relative nudge absorbs representation error so that, e.g., 0.29 / 0.01
/// floors to 29 and not 28.
pub fn floor_to_step(value: f64, step: f64) -> f64 {
    let units = (value / step * (1.0 + 1e-12)).floor();
    units.max(0.0) * step
}

/// Size a position so `lots * total_pips * pip_value` stays within
/// `risk_amount`, then clamp to the broker's lot band.
pub fn lot_size(risk_amount: f64, total_pips: f64, config: &RiskConfig) -> LotSize {
    let per_lot = total_pips * config.pip_value;
    let raw = if per_lot > 0.0 { risk_amount / per_lot } else { 0.0 };
    let budget = floor_to_step(raw, config.lot_step);

    if budget < config.min_lot {
        return LotSize {
            lots: config.min_lot,
            budget,
            under_risk: true,
        };
    }

    LotSize {
        lots: budget.min(config.max_lot),
        budget,
        under_risk: false,
    }
}
