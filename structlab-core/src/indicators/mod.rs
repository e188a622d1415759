//! Indicators and causal rolling statistics.
//!
//! Indicators are pure functions: bar history in, numeric series out. They are
//! computed once per series before scoring. No value at bar t may depend on
//! bar t+1 or later; `tests/lookahead_test.rs` enforces this with a
//! truncated-vs-full comparison.

pub mod atr;
pub mod ema;
pub mod rolling;

pub use atr::{Atr, AtrSmoothing};
pub use ema::Ema;
pub use rolling::{rolling_max, rolling_mean, rolling_min, rolling_quantile};

use crate::domain::Bar;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. Warmup values are `f64::NAN`.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "atr_14", "ema_21").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high/low one unit beyond
/// the body, volume = 1000, bars one hour apart.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
                spread: None,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
