//! Walk-forward acceptance: fold splitting and per-fold trade statistics.
//!
//! The bar range is cut into `n_folds` contiguous, equal segments. Each trade
//! is assigned to the fold containing its entry bar, so a fold's statistics
//! only ever reflect setups that fired inside it. The overall verdict applies
//! the [`AcceptanceGate`] to the whole trade list and reports how many folds
//! kept a positive expectancy on their own.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use structlab_core::domain::TradeRecord;

use crate::metrics::{AcceptanceGate, GateVerdict, TradeStats};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    /// Number of folds (default 5).
    pub n_folds: usize,
    /// Minimum bars per fold (default 50).
    pub min_fold_bars: usize,
    #[serde(default)]
    pub gate: AcceptanceGate,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            min_fold_bars: 50,
            gate: AcceptanceGate::default(),
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Bar index range of one fold, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSpec {
    pub fold_index: usize,
    pub start: usize,
    pub end: usize,
}

impl FoldSpec {
    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end).contains(&index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold: FoldSpec,
    pub stats: TradeStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub folds: Vec<FoldResult>,
    /// Folds with at least one trade and expectancy > 0.
    pub positive_folds: usize,
    pub verdict: GateVerdict,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalkForwardError {
    #[error("n_folds must be >= 1")]
    NoFolds,
    #[error("insufficient data: {total_bars} bars cannot fit {n_folds} folds of {min_fold_bars}")]
    InsufficientData {
        total_bars: usize,
        n_folds: usize,
        min_fold_bars: usize,
    },
}

// ─── Fold creation ───────────────────────────────────────────────────

/// Split `total_bars` into `n_folds` contiguous folds. The last fold absorbs
/// the remainder.
pub fn create_folds(
    total_bars: usize,
    config: &WalkForwardConfig,
) -> Result<Vec<FoldSpec>, WalkForwardError> {
    let n = config.n_folds;
    if n == 0 {
        return Err(WalkForwardError::NoFolds);
    }
    let size = total_bars / n;
    if size == 0 || size < config.min_fold_bars {
        return Err(WalkForwardError::InsufficientData {
            total_bars,
            n_folds: n,
            min_fold_bars: config.min_fold_bars,
        });
    }

    Ok((0..n)
        .map(|i| FoldSpec {
            fold_index: i,
            start: i * size,
            end: if i + 1 == n { total_bars } else { (i + 1) * size },
        })
        .collect())
}

// ─── Evaluation ──────────────────────────────────────────────────────

/// Evaluate `trades` (from a single run over `total_bars` bars) fold by fold.
pub fn evaluate(
    trades: &[TradeRecord],
    total_bars: usize,
    config: &WalkForwardConfig,
) -> Result<WalkForwardResult, WalkForwardError> {
    let folds: Vec<FoldResult> = create_folds(total_bars, config)?
        .into_iter()
        .map(|fold| {
            let in_fold: Vec<TradeRecord> = trades
                .iter()
                .filter(|t| fold.contains(t.entry_index))
                .cloned()
                .collect();
            FoldResult {
                fold,
                stats: TradeStats::compute(&in_fold),
            }
        })
        .collect();

    let positive_folds = folds
        .iter()
        .filter(|f| f.stats.trade_count > 0 && f.stats.expectancy_r > 0.0)
        .count();

    Ok(WalkForwardResult {
        folds,
        positive_folds,
        verdict: config.gate.evaluate(&TradeStats::compute(trades)),
    })
}
