//! Risk & position sizing: turns a scored candidate into a bounded trade plan.
//!
//! # Formula
//! ```text
//! risk_pct    = tier(status) * decay ^ floor(drawdown_pct / drawdown_step)
//! risk_amount = equity * risk_pct
//! stop_pips   = clamp(atr * atr_multiplier / pip_size, min_sl_pips, max_sl_pips)
//! lots        = risk_amount / ((stop_pips + spread_pips + slippage_pips) * pip_value)
//! ```
//! `lots` is floored to `lot_step` then clamped to `[min_lot, max_lot]`.
//! Take-profit sits `reward_risk` stop distances away; the breakeven trigger
//! sits `breakeven_fraction` of the way to take-profit.
//!
//! Rejections are values, not errors: most bars are rejected in a normal run.

pub mod sizing;

pub use sizing::{floor_to_step, LotSize};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Side;
use crate::error::CoreError;

/// Account health bucket driving the base risk tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Profit,
    #[default]
    #[serde(alias = "neutral")]
    Baseline,
    Drawdown,
}

/// Snapshot of the account at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub equity: f64,
    pub status: AccountStatus,
    /// Current drawdown as a fraction of peak equity (0.25 = 25%).
    #[serde(default)]
    pub drawdown_pct: f64,
}

impl AccountState {
    pub fn new(equity: f64, status: AccountStatus, drawdown_pct: f64) -> Self {
        Self {
            equity,
            status,
            drawdown_pct,
        }
    }
}

/// What the scorer hands to the risk engine for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryCandidate {
    pub side: Side,
    pub entry_price: f64,
    pub atr: f64,
    pub primary_score: u8,
    pub secondary_score: u8,
    /// Observed spread in price units; overrides the configured spread.
    #[serde(default)]
    pub spread: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub profit_risk_pct: f64,
    pub baseline_risk_pct: f64,
    pub drawdown_risk_pct: f64,
    /// Each full step of drawdown multiplies risk by `drawdown_decay`.
    pub drawdown_step: f64,
    pub drawdown_decay: f64,
    pub min_primary_score: u8,
    pub atr_multiplier: f64,
    pub min_sl_pips: f64,
    pub max_sl_pips: f64,
    pub reward_risk: f64,
    pub breakeven_fraction: f64,
    pub spread_pips: f64,
    pub slippage_pips: f64,
    /// Price increment of one pip.
    pub pip_size: f64,
    /// Account currency per pip per 1.0 lot.
    pub pip_value: f64,
    pub lot_step: f64,
    pub min_lot: f64,
    pub max_lot: f64,
}

impl Default for RiskConfig {
    /// XAUUSD: pip = 0.1, $10 per pip per standard lot.
    fn default() -> Self {
        Self {
            profit_risk_pct: 0.01,
            baseline_risk_pct: 0.005,
            drawdown_risk_pct: 0.002,
            drawdown_step: 0.2,
            drawdown_decay: 0.8,
            min_primary_score: 4,
            atr_multiplier: 1.0,
            min_sl_pips: 10.0,
            max_sl_pips: 50.0,
            reward_risk: 2.0,
            breakeven_fraction: 0.7,
            spread_pips: 2.0,
            slippage_pips: 2.0,
            pip_size: 0.1,
            pip_value: 10.0,
            lot_step: 0.01,
            min_lot: 0.01,
            max_lot: 100.0,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        let positive = [
            ("drawdown_step", self.drawdown_step),
            ("atr_multiplier", self.atr_multiplier),
            ("min_sl_pips", self.min_sl_pips),
            ("reward_risk", self.reward_risk),
            ("pip_size", self.pip_size),
            ("pip_value", self.pip_value),
            ("lot_step", self.lot_step),
            ("min_lot", self.min_lot),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CoreError::InvalidParams(format!("{name} must be > 0, got {value}")));
            }
        }
        if self.max_sl_pips < self.min_sl_pips {
            return Err(CoreError::InvalidParams(format!(
                "max_sl_pips ({}) < min_sl_pips ({})",
                self.max_sl_pips, self.min_sl_pips
            )));
        }
        if self.max_lot < self.min_lot {
            return Err(CoreError::InvalidParams(format!(
                "max_lot ({}) < min_lot ({})",
                self.max_lot, self.min_lot
            )));
        }
        if !(0.0..=1.0).contains(&self.breakeven_fraction) {
            return Err(CoreError::InvalidParams("breakeven_fraction must be in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&self.drawdown_decay) {
            return Err(CoreError::InvalidParams("drawdown_decay must be in [0, 1]".into()));
        }
        if self.spread_pips < 0.0 || self.slippage_pips < 0.0 {
            return Err(CoreError::InvalidParams("spread/slippage pips must be >= 0".into()));
        }
        Ok(())
    }
}

/// Non-fatal adjustments made while building a plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    /// Raw ATR stop was tighter than `min_sl_pips`.
    StopWidened { raw_pips: f64 },
    /// Raw ATR stop was wider than `max_sl_pips`.
    StopCapped { raw_pips: f64 },
    /// The budget bought less than `min_lot`; position raised to `min_lot`
    /// and risks more than the budget.
    UnderRisk { budget_lots: f64 },
}

/// A bounded, immutable trade plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub side: Side,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub lot_size: f64,
    pub breakeven_trigger: f64,
    pub risk_pct: f64,
    pub risk_amount: f64,
    /// Stop distance after the pip band was applied.
    pub stop_pips: f64,
    pub warnings: Vec<PlanWarning>,
}

impl TradePlan {
    /// Entry-to-stop distance in price units.
    pub fn stop_distance(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    pub fn is_under_risk(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, PlanWarning::UnderRisk { .. }))
    }
}

/// Why no plan was produced.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    #[error("missing or non-finite input: {field}")]
    MissingInputs { field: String },

    #[error("primary score {primary} below required {required}")]
    InsufficientConfluence { primary: u8, required: u8 },

    #[error("stop distance {distance} is not positive")]
    DegenerateStop { distance: f64 },

    #[error("no risk budget (equity {equity}, risk {risk_pct})")]
    NoRiskBudget { equity: f64, risk_pct: f64 },
}

impl Rejection {
    fn missing(field: &str) -> Self {
        Rejection::MissingInputs {
            field: field.to_string(),
        }
    }

    /// Stable snake_case tag, the same string serde writes to `kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::MissingInputs { .. } => "missing_inputs",
            Rejection::InsufficientConfluence { .. } => "insufficient_confluence",
            Rejection::DegenerateStop { .. } => "degenerate_stop",
            Rejection::NoRiskBudget { .. } => "no_risk_budget",
        }
    }
}

/// Stateless planner over a [`RiskConfig`].
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Tiered risk fraction after drawdown decay.
    pub fn risk_pct(&self, account: &AccountState) -> f64 {
        let c = &self.config;
        let base = match account.status {
            AccountStatus::Profit => c.profit_risk_pct,
            AccountStatus::Baseline => c.baseline_risk_pct,
            AccountStatus::Drawdown => c.drawdown_risk_pct,
        };
        let steps = (account.drawdown_pct.max(0.0) / c.drawdown_step).floor();
        base * c.drawdown_decay.powi(steps as i32)
    }

    pub fn plan(
        &self,
        account: &AccountState,
        entry: &EntryCandidate,
    ) -> Result<TradePlan, Rejection> {
        let c = &self.config;

        // ── Inputs ──
        if !(entry.entry_price.is_finite() && entry.entry_price > 0.0) {
            return Err(Rejection::missing("entry_price"));
        }
        if !entry.atr.is_finite() {
            return Err(Rejection::missing("atr"));
        }
        if !account.equity.is_finite() {
            return Err(Rejection::missing("equity"));
        }

        // ── Confluence ──
        if entry.primary_score < c.min_primary_score {
            return Err(Rejection::InsufficientConfluence {
                primary: entry.primary_score,
                required: c.min_primary_score,
            });
        }

        // ── Stop ──
        let raw_distance = entry.atr * c.atr_multiplier;
        if raw_distance <= 0.0 {
            return Err(Rejection::DegenerateStop {
                distance: raw_distance,
            });
        }

        let risk_pct = self.risk_pct(account);
        let risk_amount = account.equity * risk_pct;
        if risk_amount <= 0.0 {
            return Err(Rejection::NoRiskBudget {
                equity: account.equity,
                risk_pct,
            });
        }

        let mut warnings = Vec::new();
        let raw_pips = raw_distance / c.pip_size;
        let stop_pips = raw_pips.clamp(c.min_sl_pips, c.max_sl_pips);
        if raw_pips < c.min_sl_pips {
            warnings.push(PlanWarning::StopWidened { raw_pips });
        } else if raw_pips > c.max_sl_pips {
            warnings.push(PlanWarning::StopCapped { raw_pips });
        }

        // ── Size ──
        let spread_pips = entry
            .spread
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map_or(c.spread_pips, |s| s / c.pip_size);
        let lots = sizing::lot_size(risk_amount, stop_pips + spread_pips + c.slippage_pips, c);
        if lots.under_risk {
            warnings.push(PlanWarning::UnderRisk {
                budget_lots: lots.budget,
            });
        }

        // ── Levels ──
        let sign = entry.side.sign();
        let stop_distance = stop_pips * c.pip_size;
        let entry_price = entry.entry_price;
        let stop_loss = entry_price - sign * stop_distance;
        let take_profit = entry_price + sign * c.reward_risk * stop_distance;
        let breakeven_trigger = entry_price + c.breakeven_fraction * (take_profit - entry_price);

        Ok(TradePlan {
            side: entry.side,
            entry_price,
            stop_loss,
            take_profit,
            lot_size: lots.lots,
            breakeven_trigger,
            risk_pct,
            risk_amount,
            stop_pips,
            warnings,
        })
    }
}
