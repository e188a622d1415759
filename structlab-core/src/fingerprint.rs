//! Fingerprinting: deterministic identity for profiles, datasets and runs.
//!
//! - `ProfileHash`: every tunable plus the confluence model version.
//! - `DatasetHash`: content hash of a bar series.
//! - `RunFingerprint`: both, plus the run seed, hashed into one `run_id`.
//!
//! All hashes are BLAKE3 over a canonical byte encoding, stable across
//! builds and platforms.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::confluence::CONFLUENCE_MODEL_VERSION;
use crate::domain::BarSeries;
use crate::profile::Profile;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileHash(pub String);

impl ProfileHash {
    /// Hash the profile's canonical JSON together with the model version, so a
    /// change in flag semantics changes the hash even with identical params.
    pub fn of(profile: &Profile) -> Result<Self, serde_json::Error> {
        let canonical = serde_json::json!({
            "confluence_model_version": CONFLUENCE_MODEL_VERSION,
            "profile": serde_json::to_value(profile)?,
        });
        Ok(Self(blake3::hash(canonical.to_string().as_bytes()).to_hex().to_string()))
    }
}

impl fmt::Display for ProfileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    /// Hash timestamps and raw f64 bits of every bar field.
    pub fn of(series: &BarSeries) -> Self {
        let mut hasher = blake3::Hasher::new();
        for bar in series.bars() {
            hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
            for v in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
                hasher.update(&v.to_bits().to_le_bytes());
            }
            match bar.spread {
                Some(s) => {
                    hasher.update(&[1]);
                    hasher.update(&s.to_bits().to_le_bytes());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub profile_hash: ProfileHash,
    pub dataset_hash: DatasetHash,
    pub seed: u64,
}

impl RunFingerprint {
    pub fn new(profile: &Profile, series: &BarSeries, seed: u64) -> Result<Self, serde_json::Error> {
        Ok(Self {
            profile_hash: ProfileHash::of(profile)?,
            dataset_hash: DatasetHash::of(series),
            seed,
        })
    }

    pub fn run_id(&self) -> String {
        let canonical = serde_json::json!({
            "dataset_hash": &self.dataset_hash.0,
            "profile_hash": &self.profile_hash.0,
            "seed": self.seed,
        });
        blake3::hash(canonical.to_string().as_bytes()).to_hex().to_string()
    }
}
