//! Backtest/replay simulator: walks each planned signal forward until its
//! stop, its target or the horizon.
//!
//! Entry is at the plan's entry price on the signal bar; the scan starts on
//! the next bar, so a signal never trades against the bar that produced it.
//! The simulator is the only component that reads bars after a decision, and
//! only for the trade it is resolving.

pub mod intrabar;

pub use intrabar::{IntrabarPolicy, Touch};

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, BarSeries, ExitReason, Outcome, Side, TradeRecord};
use crate::error::CoreError;
use crate::risk::{RiskConfig, TradePlan};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Maximum bars scanned after the signal bar.
    pub horizon: usize,
    #[serde(default)]
    pub intrabar: IntrabarPolicy,
    /// Move the stop to entry once the plan's breakeven trigger trades.
    #[serde(default)]
    pub breakeven: bool,
    /// Flat deduction per trade, account currency.
    #[serde(default)]
    pub fee_per_trade: f64,
    pub pip_size: f64,
    pub pip_value: f64,
    /// Allow a new trade while another one is still open.
    #[serde(default)]
    pub allow_overlap: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        let risk = RiskConfig::default();
        Self {
            horizon: 150,
            intrabar: IntrabarPolicy::StopFirst,
            breakeven: false,
            fee_per_trade: 0.0,
            pip_size: risk.pip_size,
            pip_value: risk.pip_value,
            allow_overlap: false,
        }
    }
}

impl SimConfig {
    /// Pip settings taken from the risk config so reward and sizing agree.
    pub fn from_risk(risk: &RiskConfig) -> Self {
        Self {
            pip_size: risk.pip_size,
            pip_value: risk.pip_value,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.horizon == 0 {
            return Err(CoreError::InvalidParams("horizon must be >= 1".into()));
        }
        if !(self.pip_size > 0.0 && self.pip_value > 0.0) {
            return Err(CoreError::InvalidParams("pip_size and pip_value must be > 0".into()));
        }
        if self.fee_per_trade < 0.0 {
            return Err(CoreError::InvalidParams("fee_per_trade must be >= 0".into()));
        }
        Ok(())
    }
}

/// An accepted plan stamped with its signal bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSignal {
    pub index: usize,
    pub plan: TradePlan,
}

/// Replay every signal and return one record per resolved trade.
///
/// Signals are processed in index order. Unless `allow_overlap` is set, a
/// signal at or before the exit bar of the trade still open is skipped. A
/// signal on the final bar has nothing to scan and is skipped too.
pub fn simulate(series: &BarSeries, signals: &[PlannedSignal], config: &SimConfig) -> Vec<TradeRecord> {
    let bars = series.bars();
    let mut ordered: Vec<&PlannedSignal> = signals.iter().collect();
    ordered.sort_by_key(|s| s.index);

    let mut trades = Vec::new();
    let mut open_until: Option<usize> = None;
    let mut skipped = 0usize;

    for signal in ordered {
        if !config.allow_overlap && open_until.is_some_and(|exit| signal.index <= exit) {
            skipped += 1;
            continue;
        }
        match replay(bars, signal, config) {
            Some(trade) => {
                open_until = Some(trade.exit_index);
                trades.push(trade);
            }
            None => skipped += 1,
        }
    }

    tracing::debug!(
        signals = signals.len(),
        trades = trades.len(),
        skipped,
        "simulation finished"
    );

    trades
}

/// Resolve one trade. `None` when the signal has no bar after it.
fn replay(bars: &[Bar], signal: &PlannedSignal, config: &SimConfig) -> Option<TradeRecord> {
    let i = signal.index;
    let plan = &signal.plan;
    let last = i.checked_add(config.horizon)?.min(bars.len().checked_sub(1)?);
    if last <= i {
        return None;
    }

    let side = plan.side;
    let sign = side.sign();
    let entry = plan.entry_price;
    let initial_distance = plan.stop_distance();
    let mut stop = plan.stop_loss;
    let mut armed = false;
    let mut mae = 0.0_f64;
    let mut mfe = 0.0_f64;

    let mut exit: Option<(usize, f64, ExitReason)> = None;

    for (j, bar) in bars.iter().enumerate().take(last + 1).skip(i + 1) {
        if bar.is_void() {
            continue;
        }

        let (adverse, favorable) = match side {
            Side::Long => (bar.low, bar.high),
            Side::Short => (bar.high, bar.low),
        };
        mae = mae.min(sign * (adverse - entry));
        mfe = mfe.max(sign * (favorable - entry));

        if config.breakeven && !armed && intrabar::reached(bar, side, plan.breakeven_trigger) {
            stop = entry;
            armed = true;
        }

        match intrabar::resolve(bar, side, stop, plan.take_profit, config.intrabar) {
            Some(Touch::Stop) => {
                let reason = if armed {
                    ExitReason::BreakevenStop
                } else {
                    ExitReason::StopLoss
                };
                exit = Some((j, stop, reason));
                break;
            }
            Some(Touch::Target) => {
                exit = Some((j, plan.take_profit, ExitReason::TakeProfit));
                break;
            }
            None => {}
        }
    }

    let (exit_index, exit_price, exit_reason) =
        exit.unwrap_or((last, bars[last].close, ExitReason::Horizon));

    let outcome = match exit_reason {
        ExitReason::TakeProfit => Outcome::Win,
        ExitReason::StopLoss | ExitReason::BreakevenStop => Outcome::Loss,
        ExitReason::Horizon => Outcome::Timeout,
    };

    let signed_move = sign * (exit_price - entry);
    let reward = signed_move / config.pip_size * config.pip_value * plan.lot_size - config.fee_per_trade;
    let reward_r = if initial_distance > 0.0 {
        signed_move / initial_distance
    } else {
        0.0
    };

    Some(TradeRecord {
        side,
        entry_index: i,
        entry_time: bars[i].timestamp,
        entry_price: entry,
        exit_index,
        exit_time: bars[exit_index].timestamp,
        exit_price,
        outcome,
        exit_reason,
        lot_size: plan.lot_size,
        reward,
        reward_r,
        bars_held: exit_index - i,
        mae,
        mfe,
    })
}
