//! Intrabar policy: which level fills when one bar spans both stop and target.
//!
//! OHLC cannot tell which level traded first. `StopFirst` assumes the worst
//! and is the default; `TargetFirst` exists to measure how much a result
//! depends on that assumption.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Side};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntrabarPolicy {
    #[default]
    StopFirst,
    TargetFirst,
}

/// Level touched on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touch {
    Stop,
    Target,
}

/// Resolve which level, if any, fills on `bar`.
pub fn resolve(bar: &Bar, side: Side, stop: f64, target: f64, policy: IntrabarPolicy) -> Option<Touch> {
    let (stop_hit, target_hit) = match side {
        Side::Long => (bar.low <= stop, bar.high >= target),
        Side::Short => (bar.high >= stop, bar.low <= target),
    };

    match (stop_hit, target_hit, policy) {
        (true, true, IntrabarPolicy::StopFirst) => Some(Touch::Stop),
        (true, true, IntrabarPolicy::TargetFirst) => Some(Touch::Target),
        (true, false, _) => Some(Touch::Stop),
        (false, true, _) => Some(Touch::Target),
        (false, false, _) => None,
    }
}

/// True when `bar` traded through `level` in the favorable direction.
pub fn reached(bar: &Bar, side: Side, level: f64) -> bool {
    match side {
        Side::Long => bar.high >= level,
        Side::Short => bar.low <= level,
    }
}
