//! Run configuration, loaded from TOML.
//!
//! ```toml
//! [run]
//! name = "xau-2024"
//! seed = 7
//! output_dir = "artifacts"
//!
//! [account]
//! equity = 10000.0
//! status = "baseline"
//! drawdown_pct = 0.0
//!
//! [[timeframes]]
//! timeframe = "H1"
//! bars = "data/xauusd_h1.csv"
//!
//! [timeframes.overrides.risk]
//! reward_risk = 2.5
//! ```
//!
//! Each timeframe starts from `Profile::for_timeframe` and the `overrides`
//! table is merged over it key by key, so a config only names what differs
//! from the preset.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use structlab_core::domain::Timeframe;
use structlab_core::risk::{AccountState, AccountStatus};
use structlab_core::{CoreError, Profile};

/// Errors from loading or validating a run config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid profile override for {timeframe}: {message}")]
    Override { timeframe: Timeframe, message: String },

    #[error("invalid profile for {timeframe}: {source}")]
    Profile {
        timeframe: Timeframe,
        #[source]
        source: CoreError,
    },

    #[error("timeframe {0} is configured more than once")]
    DuplicateTimeframe(Timeframe),

    #[error("timeframe {0}: exactly one of `bars` or `synthetic` must be set")]
    BarSource(Timeframe),

    #[error("no timeframes configured")]
    NoTimeframes,

    #[error("invalid account: {0}")]
    Account(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    pub name: String,
    /// Seeds synthetic data and is part of every run id.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub equity: f64,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub drawdown_pct: f64,
}

impl AccountConfig {
    pub fn state(&self) -> AccountState {
        AccountState::new(self.equity, self.status, self.drawdown_pct)
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            equity: 10_000.0,
            status: AccountStatus::Baseline,
            drawdown_pct: 0.0,
        }
    }
}

/// Where a timeframe's bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeConfig {
    pub timeframe: Timeframe,
    /// CSV path, relative to the config file.
    #[serde(default)]
    pub bars: Option<PathBuf>,
    /// Generate this many seeded synthetic bars instead of reading a file.
    #[serde(default)]
    pub synthetic: Option<usize>,
    /// Partial profile merged over the timeframe preset.
    #[serde(default)]
    pub overrides: Option<toml::Table>,
}

impl TimeframeConfig {
    /// The preset for this timeframe with `overrides` applied, validated.
    pub fn profile(&self) -> Result<Profile, ConfigError> {
        let preset = Profile::for_timeframe(self.timeframe);
        let profile = match &self.overrides {
            None => preset,
            Some(overrides) => {
                let override_err = |e: &dyn std::fmt::Display| ConfigError::Override {
                    timeframe: self.timeframe,
                    message: e.to_string(),
                };
                let mut merged = toml::Value::try_from(&preset).map_err(|e| override_err(&e))?;
                merge(&mut merged, toml::Value::Table(overrides.clone()));
                merged.try_into::<Profile>().map_err(|e| override_err(&e))?
            }
        };
        if profile.timeframe != self.timeframe {
            return Err(ConfigError::Override {
                timeframe: self.timeframe,
                message: format!("overrides change the timeframe to {}", profile.timeframe),
            });
        }
        profile.validate().map_err(|source| ConfigError::Profile {
            timeframe: self.timeframe,
            source,
        })?;
        Ok(profile)
    }
}

/// Recursively overlay `overlay` on `base`. Tables merge; anything else
/// replaces.
fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// A complete run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub run: RunSection,
    #[serde(default)]
    pub account: AccountConfig,
    pub timeframes: Vec<TimeframeConfig>,
}

impl RunConfig {
    /// Load from a TOML file. Relative bar paths are resolved against the
    /// file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parse and validate a TOML string. Paths are left as written.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeframes.is_empty() {
            return Err(ConfigError::NoTimeframes);
        }
        let mut seen = BTreeSet::new();
        for tf in &self.timeframes {
            if !seen.insert(tf.timeframe) {
                return Err(ConfigError::DuplicateTimeframe(tf.timeframe));
            }
            if tf.bars.is_some() == tf.synthetic.is_some() {
                return Err(ConfigError::BarSource(tf.timeframe));
            }
            tf.profile()?;
        }
        let a = &self.account;
        if !(a.equity.is_finite() && a.equity > 0.0) {
            return Err(ConfigError::Account(format!("equity must be > 0, got {}", a.equity)));
        }
        if !(0.0..1.0).contains(&a.drawdown_pct) {
            return Err(ConfigError::Account(format!(
                "drawdown_pct must be in [0, 1), got {}",
                a.drawdown_pct
            )));
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        for tf in &mut self.timeframes {
            tf.bars = tf
                .bars
                .take()
                .map(|bars| if bars.is_relative() { base.join(bars) } else { bars });
        }
    }

    /// Deterministic BLAKE3 id of the whole config.
    pub fn run_id(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
