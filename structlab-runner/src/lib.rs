//! StructLab Runner: config loading, bar ingestion, multi-timeframe
//! orchestration, statistics and artifact export.
//!
//! This crate builds on `structlab-core` to provide:
//! - TOML run configs with per-timeframe profile overrides
//! - CSV bar loading with boundary validation, plus seeded synthetic bars
//! - Parallel per-timeframe runs with the HTF regime joined read-only
//! - Trade statistics and the walk-forward acceptance gate
//! - JSON / CSV / Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod walk_forward;

pub use config::{AccountConfig, ConfigError, RunConfig, RunSection, TimeframeConfig};
pub use data_loader::{load_csv, read_bars, synthetic_series, LoadError, LoadedSeries};
pub use metrics::{AcceptanceGate, GateVerdict, TradeStats};
pub use runner::{
    run, run_jobs, run_timeframe, RunError, RunResult, TimeframeJob, TimeframeResult,
    SCHEMA_VERSION,
};
pub use walk_forward::{FoldSpec, WalkForwardConfig, WalkForwardResult};
