//! Trade statistics over a simulated trade list.
//!
//! Every metric is a pure function: trades in, scalar out. Drawdown and
//! expectancy are measured in R so they stay comparable across lot sizes.

use serde::{Deserialize, Serialize};
use structlab_core::domain::{ExitReason, Outcome, TradeRecord};

/// Aggregate statistics for one timeframe's trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub timeouts: usize,
    pub breakeven_stops: usize,
    /// Wins / trades.
    pub win_rate: f64,
    pub total_reward: f64,
    pub total_r: f64,
    /// Mean R per trade.
    pub expectancy_r: f64,
    pub profit_factor: f64,
    /// Deepest peak-to-trough fall of the cumulative R curve (<= 0).
    pub max_drawdown_r: f64,
    pub max_consecutive_losses: usize,
    pub avg_bars_held: f64,
    pub avg_mae: f64,
    pub avg_mfe: f64,
}

impl TradeStats {
    pub fn compute(trades: &[TradeRecord]) -> Self {
        let count_outcome = |o: Outcome| trades.iter().filter(|t| t.outcome == o).count();
        Self {
            trade_count: trades.len(),
            wins: count_outcome(Outcome::Win),
            losses: count_outcome(Outcome::Loss),
            timeouts: count_outcome(Outcome::Timeout),
            breakeven_stops: trades
                .iter()
                .filter(|t| t.exit_reason == ExitReason::BreakevenStop)
                .count(),
            win_rate: win_rate(trades),
            total_reward: trades.iter().map(|t| t.reward).sum(),
            total_r: trades.iter().map(|t| t.reward_r).sum(),
            expectancy_r: mean(trades.iter().map(|t| t.reward_r)),
            profit_factor: profit_factor(trades),
            max_drawdown_r: max_drawdown_r(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
            avg_bars_held: mean(trades.iter().map(|t| t.bars_held as f64)),
            avg_mae: mean(trades.iter().map(|t| t.mae)),
            avg_mfe: mean(trades.iter().map(|t| t.mfe)),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of trades that hit their target.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profits / gross losses on `reward`.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.reward > 0.0).map(|t| t.reward).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.reward < 0.0)
        .map(|t| t.reward.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Maximum drawdown of the cumulative R curve, as a non-positive number.
pub fn max_drawdown_r(trades: &[TradeRecord]) -> f64 {
    let mut equity = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for t in trades {
        equity += t.reward_r;
        peak = peak.max(equity);
        max_dd = max_dd.min(equity - peak);
    }
    max_dd
}

/// Longest run of non-winning trades.
pub fn max_consecutive_losses(trades: &[TradeRecord]) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for t in trades {
        if t.outcome == Outcome::Loss {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

// ─── Acceptance gate ────────────────────────────────────────────────

/// Minimum sample and hit rate a timeframe must show before its setups are
/// considered for live use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceGate {
    pub min_trades: usize,
    /// Fraction, 0.5 = 50%.
    pub min_win_rate: f64,
}

impl Default for AcceptanceGate {
    fn default() -> Self {
        Self {
            min_trades: 30,
            min_win_rate: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    pub passed: bool,
    pub reasons: Vec<String>,
}

impl AcceptanceGate {
    pub fn evaluate(&self, stats: &TradeStats) -> GateVerdict {
        let mut reasons = Vec::new();
        if stats.trade_count < self.min_trades {
            reasons.push(format!(
                "{} trades, need at least {}",
                stats.trade_count, self.min_trades
            ));
        }
        if stats.win_rate < self.min_win_rate {
            reasons.push(format!(
                "win rate {:.1}% below {:.1}%",
                stats.win_rate * 100.0,
                self.min_win_rate * 100.0
            ));
        }
        GateVerdict {
            passed: reasons.is_empty(),
            reasons,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use structlab_core::domain::Side;

    pub(crate) fn make_trade(entry_index: usize, outcome: Outcome, reward_r: f64) -> TradeRecord {
        let ts = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let exit_reason = match outcome {
            Outcome::Win => ExitReason::TakeProfit,
            Outcome::Loss => ExitReason::StopLoss,
            Outcome::Timeout => ExitReason::Horizon,
        };
        TradeRecord {
            side: Side::Long,
            entry_index,
            entry_time: ts,
            entry_price: 2000.0,
            exit_index: entry_index + 4,
            exit_time: ts + chrono::Duration::hours(4),
            exit_price: 2000.0 + reward_r * 2.0,
            outcome,
            exit_reason,
            lot_size: 0.1,
            reward: reward_r * 20.0,
            reward_r,
            bars_held: 4,
            mae: -1.0,
            mfe: 2.0,
        }
    }

    fn sample() -> Vec<TradeRecord> {
        vec![
            make_trade(0, Outcome::Win, 2.0),
            make_trade(10, Outcome::Loss, -1.0),
            make_trade(20, Outcome::Loss, -1.0),
            make_trade(30, Outcome::Timeout, 0.5),
            make_trade(40, Outcome::Win, 2.0),
        ]
    }

    #[test]
    fn stats_on_sample() {
        let s = TradeStats::compute(&sample());
        assert_eq!(s.trade_count, 5);
        assert_eq!((s.wins, s.losses, s.timeouts), (2, 2, 1));
        assert!((s.win_rate - 0.4).abs() < 1e-12);
        assert!((s.total_r - 2.5).abs() < 1e-12);
        assert!((s.expectancy_r - 0.5).abs() < 1e-12);
        // gross profit 4.5R * 20, gross loss 2R * 20
        assert!((s.profit_factor - 2.25).abs() < 1e-12);
        assert_eq!(s.max_consecutive_losses, 2);
        assert!((s.max_drawdown_r + 2.0).abs() < 1e-12);
        assert_eq!(s.avg_bars_held, 4.0);
    }

    #[test]
    fn empty_stats_are_zero() {
        let s = TradeStats::compute(&[]);
        assert_eq!(s.trade_count, 0);
        assert_eq!(s.win_rate, 0.0);
        assert_eq!(s.expectancy_r, 0.0);
        assert_eq!(s.profit_factor, 0.0);
        assert_eq!(s.max_drawdown_r, 0.0);
    }

    #[test]
    fn profit_factor_caps_without_losses() {
        let trades = vec![make_trade(0, Outcome::Win, 2.0)];
        assert_eq!(profit_factor(&trades), 100.0);
    }

    #[test]
    fn gate_needs_sample_and_hit_rate() {
        let gate = AcceptanceGate::default();
        let small = gate.evaluate(&TradeStats::compute(&sample()));
        assert!(!small.passed);
        assert_eq!(small.reasons.len(), 2);

        let many: Vec<TradeRecord> = (0..40)
            .map(|i| {
                if i % 3 == 0 {
                    make_trade(i * 10, Outcome::Loss, -1.0)
                } else {
                    make_trade(i * 10, Outcome::Win, 2.0)
                }
            })
            .collect();
        let verdict = gate.evaluate(&TradeStats::compute(&many));
        assert!(verdict.passed, "{:?}", verdict.reasons);
    }
}
