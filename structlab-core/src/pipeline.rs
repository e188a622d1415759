//! One-timeframe pipeline: structure → patterns → confluence → risk → replay.
//!
//! Pure and deterministic: identical inputs give identical output, field for
//! field. Multiple timeframes are independent calls; the only cross-timeframe
//! input is the read-only [`HtfRegime`].

use serde::{Deserialize, Serialize};

use crate::confluence::{self, Candidate, ConfluenceSeries, HtfRegime, SetupGrade};
use crate::domain::{BarSeries, Bias, Side, TradeRecord};
use crate::indicators::{Atr, Indicator};
use crate::patterns::{GeometricClassifier, PatternClassifier, PatternCode};
use crate::profile::Profile;
use crate::risk::{AccountState, EntryCandidate, Rejection, RiskEngine, TradePlan};
use crate::simulator::{self, PlannedSignal};
use crate::structure::{self, StructureOutput};

/// Risk decision for one candidate bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub index: usize,
    pub side: Side,
    pub grade: SetupGrade,
    pub result: Result<TradePlan, Rejection>,
}

impl Decision {
    pub fn plan(&self) -> Option<&TradePlan> {
        self.result.as_ref().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub structure: StructureOutput,
    pub patterns: Vec<PatternCode>,
    pub confluence: ConfluenceSeries,
    pub atr: Vec<f64>,
    pub decisions: Vec<Decision>,
    pub trades: Vec<TradeRecord>,
}

impl PipelineOutput {
    pub fn accepted(&self) -> usize {
        self.decisions.iter().filter(|d| d.result.is_ok()).count()
    }

    pub fn rejected(&self) -> usize {
        self.decisions.len() - self.accepted()
    }
}

/// Run the full pipeline with the built-in geometric candle classifier.
pub fn run_pipeline(
    series: &BarSeries,
    profile: &Profile,
    account: &AccountState,
    htf: Option<&HtfRegime>,
) -> PipelineOutput {
    let classifier = GeometricClassifier::new(profile.candles);
    run_pipeline_with(series, profile, account, htf, &classifier)
}

/// Run the full pipeline with a caller-supplied pattern classifier.
///
/// The profile must already be validated.
pub fn run_pipeline_with(
    series: &BarSeries,
    profile: &Profile,
    account: &AccountState,
    htf: Option<&HtfRegime>,
    classifier: &dyn PatternClassifier,
) -> PipelineOutput {
    let bars = series.bars();

    let structure = structure::detect(series, &profile.swing);
    let patterns = classifier.classify(bars);
    let confluence = confluence::score(series, &structure, &patterns, &profile.confluence);
    let atr = Atr::new(profile.atr_period, profile.atr_smoothing).compute(bars);

    let candidates = profile.entry.candidates(series, &confluence, htf);
    let engine = RiskEngine::new(profile.risk.clone());
    let decisions: Vec<Decision> = candidates
        .iter()
        .map(|c| decide(&engine, account, series, &atr, c))
        .collect();

    let signals: Vec<PlannedSignal> = decisions
        .iter()
        .filter_map(|d| {
            d.plan().map(|plan| PlannedSignal {
                index: d.index,
                plan: plan.clone(),
            })
        })
        .collect();
    let trades = simulator::simulate(series, &signals, &profile.sim);

    tracing::debug!(
        timeframe = %profile.timeframe,
        bars = series.len(),
        candidates = candidates.len(),
        plans = signals.len(),
        trades = trades.len(),
        "pipeline finished"
    );

    PipelineOutput {
        structure,
        patterns,
        confluence,
        atr,
        decisions,
        trades,
    }
}

fn decide(
    engine: &RiskEngine,
    account: &AccountState,
    series: &BarSeries,
    atr: &[f64],
    candidate: &Candidate,
) -> Decision {
    let bar = &series[candidate.index];
    let entry = EntryCandidate {
        side: candidate.side,
        entry_price: bar.close,
        atr: atr.get(candidate.index).copied().unwrap_or(f64::NAN),
        primary_score: candidate.vector.primary_score,
        secondary_score: candidate.vector.secondary_score,
        spread: bar.spread,
    };
    Decision {
        index: candidate.index,
        side: candidate.side,
        grade: candidate.vector.setup_grade(),
        result: engine.plan(account, &entry),
    }
}

/// Regime bias per bar for a series, without scoring or trading. This is
/// what a higher timeframe contributes to the lower ones.
pub fn regime_for(series: &BarSeries, profile: &Profile) -> Vec<Bias> {
    let structure = structure::detect(series, &profile.swing);
    confluence::regime_series(series, &structure, &profile.confluence)
}

/// Build the read-only HTF regime map for `series` under `profile`.
pub fn htf_regime(series: &BarSeries, profile: &Profile) -> HtfRegime {
    HtfRegime::from_series(series, profile.timeframe, &regime_for(series, profile))
}
