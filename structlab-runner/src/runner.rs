//! Run orchestration: load every configured timeframe, then fan the
//! pipelines out with rayon.
//!
//! Two phases:
//! 1. Regime series for every timeframe that is some other timeframe's HTF.
//! 2. The full pipeline per timeframe, with its HTF regime joined read-only.
//!
//! Results keep config order regardless of scheduling.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use structlab_core::confluence::HtfRegime;
use structlab_core::domain::{Timeframe, TradeRecord};
use structlab_core::fingerprint::{DatasetHash, ProfileHash, RunFingerprint};
use structlab_core::pipeline::htf_regime;
use structlab_core::risk::AccountState;
use structlab_core::{run_pipeline, Profile};

use crate::config::{AccountConfig, ConfigError, RunConfig, TimeframeConfig};
use crate::data_loader::{load_csv, synthetic_series, LoadError, LoadedSeries};
use crate::metrics::{GateVerdict, TradeStats};
use crate::walk_forward::{self, WalkForwardConfig, WalkForwardResult};

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error for {timeframe}: {source}")]
    Load {
        timeframe: Timeframe,
        #[source]
        source: LoadError,
    },

    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// One timeframe, loaded and ready to run.
#[derive(Debug, Clone)]
pub struct TimeframeJob {
    pub data: LoadedSeries,
    pub profile: Profile,
}

impl TimeframeJob {
    pub fn timeframe(&self) -> Timeframe {
        self.profile.timeframe
    }
}

/// Result for one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeResult {
    pub timeframe: Timeframe,
    pub run_id: String,
    pub profile_hash: ProfileHash,
    pub dataset_hash: DatasetHash,
    pub synthetic: bool,
    pub bar_count: usize,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Higher timeframe whose regime was available, if any.
    pub htf: Option<Timeframe>,
    pub candidates: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Rejection counts keyed by `Rejection::kind`.
    pub rejections: BTreeMap<String, usize>,
    pub liquidity_fallback: bool,
    pub stats: TradeStats,
    /// None when the series is too short to fold.
    pub walk_forward: Option<WalkForwardResult>,
    pub verdict: GateVerdict,
    pub trades: Vec<TradeRecord>,
}

/// Complete result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub name: String,
    pub run_id: String,
    pub seed: u64,
    pub account: AccountConfig,
    pub timeframes: Vec<TimeframeResult>,
    pub has_synthetic: bool,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RunResult {
    pub fn timeframe(&self, tf: Timeframe) -> Option<&TimeframeResult> {
        self.timeframes.iter().find(|r| r.timeframe == tf)
    }

    pub fn total_trades(&self) -> usize {
        self.timeframes.iter().map(|r| r.stats.trade_count).sum()
    }
}

// ─── Entry points ────────────────────────────────────────────────────

/// Load data for every configured timeframe and run them.
///
/// This is the high-level entry point used by the CLI.
pub fn run(config: &RunConfig) -> Result<RunResult, RunError> {
    config.validate()?;
    let jobs: Vec<TimeframeJob> = config
        .timeframes
        .par_iter()
        .map(|tf| load_job(tf, config.run.seed))
        .collect::<Result<_, _>>()?;

    let timeframes = run_jobs(
        &jobs,
        &config.account.state(),
        config.run.seed,
        &WalkForwardConfig::default(),
    )?;

    let result = RunResult {
        schema_version: SCHEMA_VERSION,
        name: config.run.name.clone(),
        run_id: config.run_id()?,
        seed: config.run.seed,
        account: config.account,
        has_synthetic: timeframes.iter().any(|r| r.synthetic),
        timeframes,
    };
    tracing::info!(
        run = %result.name,
        run_id = %result.run_id,
        timeframes = result.timeframes.len(),
        trades = result.total_trades(),
        "run finished"
    );
    Ok(result)
}

fn load_job(tf: &TimeframeConfig, seed: u64) -> Result<TimeframeJob, RunError> {
    let profile = tf.profile()?;
    let data = match (&tf.bars, tf.synthetic) {
        (Some(path), _) => load_csv(path, tf.timeframe).map_err(|source| RunError::Load {
            timeframe: tf.timeframe,
            source,
        })?,
        (None, Some(n)) => synthetic_series(n, tf.timeframe, seed),
        (None, None) => return Err(ConfigError::BarSource(tf.timeframe).into()),
    };
    Ok(TimeframeJob { data, profile })
}

/// Run already-loaded jobs. Each job may use at most one other job as its
/// HTF: the one whose timeframe is `Timeframe::higher()` of its own.
pub fn run_jobs(
    jobs: &[TimeframeJob],
    account: &AccountState,
    seed: u64,
    wf_config: &WalkForwardConfig,
) -> Result<Vec<TimeframeResult>, RunError> {
    // Phase 1: regimes, only for timeframes something else looks up to
    let wanted: BTreeSet<Timeframe> = jobs.iter().filter_map(|j| j.timeframe().higher()).collect();
    let regimes: BTreeMap<Timeframe, HtfRegime> = jobs
        .par_iter()
        .filter(|j| wanted.contains(&j.timeframe()))
        .map(|j| (j.timeframe(), htf_regime(&j.data.series, &j.profile)))
        .collect();

    // Phase 2: full pipelines
    jobs.par_iter()
        .map(|job| {
            let htf = job
                .timeframe()
                .higher()
                .and_then(|h| regimes.get(&h).map(|r| (h, r)));
            run_timeframe(job, account, htf, seed, wf_config)
        })
        .collect()
}

/// Run one timeframe with an optional `(timeframe, regime)` HTF input.
pub fn run_timeframe(
    job: &TimeframeJob,
    account: &AccountState,
    htf: Option<(Timeframe, &HtfRegime)>,
    seed: u64,
    wf_config: &WalkForwardConfig,
) -> Result<TimeframeResult, RunError> {
    let series = &job.data.series;
    let fingerprint = RunFingerprint::new(&job.profile, series, seed)?;
    let output = run_pipeline(series, &job.profile, account, htf.map(|(_, r)| r));

    let mut rejections = BTreeMap::new();
    for decision in &output.decisions {
        if let Err(rejection) = &decision.result {
            *rejections.entry(rejection.kind().to_string()).or_insert(0) += 1;
        }
    }

    let stats = TradeStats::compute(&output.trades);
    let walk_forward = match walk_forward::evaluate(&output.trades, series.len(), wf_config) {
        Ok(wf) => Some(wf),
        Err(e) => {
            tracing::debug!(timeframe = %job.timeframe(), error = %e, "walk-forward skipped");
            None
        }
    };
    let verdict = walk_forward
        .as_ref()
        .map(|wf| wf.verdict.clone())
        .unwrap_or_else(|| wf_config.gate.evaluate(&stats));

    tracing::info!(
        timeframe = %job.timeframe(),
        bars = series.len(),
        candidates = output.decisions.len(),
        accepted = output.accepted(),
        trades = stats.trade_count,
        win_rate = stats.win_rate,
        passed = verdict.passed,
        synthetic = job.data.synthetic,
        "timeframe finished"
    );

    Ok(TimeframeResult {
        timeframe: job.timeframe(),
        run_id: fingerprint.run_id(),
        profile_hash: fingerprint.profile_hash,
        dataset_hash: fingerprint.dataset_hash,
        synthetic: job.data.synthetic,
        bar_count: series.len(),
        start: series.bars().first().map(|b| b.timestamp),
        end: series.bars().last().map(|b| b.timestamp),
        htf: htf.map(|(tf, _)| tf),
        candidates: output.decisions.len(),
        accepted: output.accepted(),
        rejected: output.rejected(),
        rejections,
        liquidity_fallback: output.confluence.liquidity_fallback,
        stats,
        walk_forward,
        verdict,
        trades: output.trades,
    })
}
