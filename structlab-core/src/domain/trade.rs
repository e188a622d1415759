//! TradeRecord: one simulated round trip, from signal bar to resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::structure::Bias;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short. Multiplies a raw price move into a signed PnL move.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn from_bias(bias: Bias) -> Self {
        match bias {
            Bias::Bull => Side::Long,
            Bias::Bear => Side::Short,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Timeout,
}

/// Which level closed the trade.
///
/// A stop at entry after the breakeven trigger armed is reported as
/// `BreakevenStop` with outcome `Loss` (the fee makes it a small loser).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    BreakevenStop,
    TakeProfit,
    Horizon,
}

/// A resolved simulated trade. Append-only output of the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: Side,

    // ── Entry ──
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,

    pub outcome: Outcome,
    pub exit_reason: ExitReason,

    // ── Size and result ──
    pub lot_size: f64,
    /// Monetary result after the per-trade fee.
    pub reward: f64,
    /// Signed price move divided by the initial stop distance.
    pub reward_r: f64,

    pub bars_held: usize,
    /// Maximum adverse excursion in price units (<= 0).
    pub mae: f64,
    /// Maximum favorable excursion in price units (>= 0).
    pub mfe: f64,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.outcome == Outcome::Win
    }
}
