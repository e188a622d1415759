//! Candle pattern classification.
//!
//! The confluence scorer only needs one [`PatternCode`] per bar; where the
//! codes come from is behind the [`PatternClassifier`] trait. The bundled
//! [`GeometricClassifier`] matches eight single- and multi-bar shapes using
//! per-timeframe body/wick thresholds.
//!
//! Multi-bar patterns are reported on their last bar, so the code at bar `i`
//! only depends on bars `i-2 ..= i`.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Timeframe};

/// Fixed pattern enumeration. The integer codes are part of the export contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PatternCode {
    #[default]
    None = 0,
    BullishEngulfing = 1,
    BearishEngulfing = 2,
    Hammer = 3,
    InvertedHammer = 4,
    Doji = 5,
    ShootingStar = 6,
    MorningStar = 7,
    EveningStar = 8,
}

impl PatternCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => PatternCode::None,
            1 => PatternCode::BullishEngulfing,
            2 => PatternCode::BearishEngulfing,
            3 => PatternCode::Hammer,
            4 => PatternCode::InvertedHammer,
            5 => PatternCode::Doji,
            6 => PatternCode::ShootingStar,
            7 => PatternCode::MorningStar,
            8 => PatternCode::EveningStar,
            _ => return None,
        })
    }

    pub fn is_pattern(self) -> bool {
        self != PatternCode::None
    }
}

/// Classifies every bar of a series into one pattern code.
pub trait PatternClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// One code per bar, same length as `bars`. Must not read past bar `i`
    /// when classifying bar `i`.
    fn classify(&self, bars: &[Bar]) -> Vec<PatternCode>;
}

/// Body/wick thresholds for the geometric rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleThresholds {
    /// Dominant wick must exceed `wick_mult * body`.
    pub wick_mult: f64,
    /// Hammer-family body must exceed `body_pct * range`.
    pub body_pct: f64,
    /// Doji body must stay below `doji_body * range`.
    pub doji_body: f64,
}

impl CandleThresholds {
    pub fn for_timeframe(tf: Timeframe) -> Self {
        let (wick_mult, body_pct, doji_body) = match tf {
            Timeframe::M5 => (1.0, 0.08, 0.18),
            Timeframe::M15 => (1.2, 0.10, 0.16),
            Timeframe::H1 => (1.5, 0.12, 0.14),
            Timeframe::H4 => (1.7, 0.13, 0.12),
            Timeframe::D1 => (2.0, 0.15, 0.10),
        };
        Self {
            wick_mult,
            body_pct,
            doji_body,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeometricClassifier {
    thresholds: CandleThresholds,
}

impl GeometricClassifier {
    pub fn new(thresholds: CandleThresholds) -> Self {
        Self { thresholds }
    }

    pub fn for_timeframe(tf: Timeframe) -> Self {
        Self::new(CandleThresholds::for_timeframe(tf))
    }

    /// Classify bar `i` from `bars[..=i]`. First matching rule wins.
    pub fn classify_at(&self, bars: &[Bar], i: usize) -> PatternCode {
        let t = &self.thresholds;
        let bar = &bars[i];
        if bar.is_void() {
            return PatternCode::None;
        }
        let prev = i.checked_sub(1).map(|j| &bars[j]);

        let body = bar.body();
        let range = bar.range();
        let upper = bar.upper_wick();
        let lower = bar.lower_wick();

        if let Some(p) = prev {
            if p.is_bearish() && bar.is_bullish() && bar.close > p.open && bar.open < p.close {
                return PatternCode::BullishEngulfing;
            }
            if p.is_bullish() && bar.is_bearish() && bar.close < p.open && bar.open > p.close {
                return PatternCode::BearishEngulfing;
            }
        }

        let body_ok = body > t.body_pct * range;
        if bar.is_bullish() && lower > t.wick_mult * body && upper < body && body_ok {
            return PatternCode::Hammer;
        }
        if bar.is_bullish() && upper > t.wick_mult * body && lower < body && body_ok {
            return PatternCode::InvertedHammer;
        }
        if bar.is_bearish() && upper > t.wick_mult * body && lower < body && body_ok {
            return PatternCode::ShootingStar;
        }
        if range > 0.0 && body < t.doji_body * range && upper > 0.2 * range && lower > 0.2 * range {
            return PatternCode::Doji;
        }

        // Stars: bars[i-2] sets direction, bars[i-1] is the pivot, bars[i] confirms.
        if i >= 2 {
            let first = &bars[i - 2];
            let pivot = &bars[i - 1];
            let pivot_body_ok = pivot.body() > 0.1 * pivot.range();
            if first.is_bearish()
                && pivot.is_bullish()
                && pivot_body_ok
                && pivot.close > first.open
                && bar.is_bullish()
            {
                return PatternCode::MorningStar;
            }
            if first.is_bullish()
                && pivot.is_bearish()
                && pivot_body_ok
                && pivot.close < first.open
                && bar.is_bearish()
            {
                return PatternCode::EveningStar;
            }
        }

        PatternCode::None
    }
}

impl PatternClassifier for GeometricClassifier {
    fn name(&self) -> &str {
        "geometric"
    }

    fn classify(&self, bars: &[Bar]) -> Vec<PatternCode> {
        (0..bars.len()).map(|i| self.classify_at(bars, i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(i: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
        let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        Bar {
            timestamp: base + chrono::Duration::hours(i),
            open,
            high,
            low,
            close,
            volume: 100.0,
            spread: None,
        }
    }

    fn m5() -> GeometricClassifier {
        GeometricClassifier::for_timeframe(Timeframe::M5)
    }

    #[test]
    fn bullish_engulfing() {
        let bars = vec![bar(0, 105.0, 106.0, 99.0, 100.0), bar(1, 99.0, 108.0, 98.0, 107.0)];
        assert_eq!(m5().classify_at(&bars, 1), PatternCode::BullishEngulfing);
    }

    #[test]
    fn bearish_engulfing() {
        let bars = vec![bar(0, 100.0, 106.0, 99.0, 105.0), bar(1, 106.0, 107.0, 97.0, 98.0)];
        assert_eq!(m5().classify_at(&bars, 1), PatternCode::BearishEngulfing);
    }

    #[test]
    fn hammer() {
        // body 2, lower wick 8, upper wick 1
        let bars = vec![bar(0, 100.0, 103.0, 92.0, 102.0)];
        assert_eq!(m5().classify_at(&bars, 0), PatternCode::Hammer);
    }

    #[test]
    fn shooting_star() {
        // bearish body 2, upper wick 8, lower wick 1
        let bars = vec![bar(0, 102.0, 110.0, 99.0, 100.0)];
        assert_eq!(m5().classify_at(&bars, 0), PatternCode::ShootingStar);
    }

    #[test]
    fn doji() {
        let bars = vec![bar(0, 100.0, 105.0, 95.0, 100.5)];
        assert_eq!(m5().classify_at(&bars, 0), PatternCode::Doji);
    }

    #[test]
    fn morning_star_reported_on_confirming_bar() {
        let bars = vec![
            bar(0, 110.0, 111.0, 99.0, 100.0), // bearish, open 110
            bar(1, 101.0, 113.0, 100.5, 112.0), // bullish pivot closing above 110
            bar(2, 112.0, 116.0, 111.0, 115.0), // bullish confirmation
        ];
        let codes = m5().classify(&bars);
        assert_eq!(codes[2], PatternCode::MorningStar);
    }

    #[test]
    fn codes_roundtrip() {
        for code in 0..=8u8 {
            assert_eq!(PatternCode::from_code(code).unwrap().code(), code);
        }
        assert!(PatternCode::from_code(9).is_none());
    }

    #[test]
    fn classification_ignores_future_bars() {
        let bars = vec![
            bar(0, 100.0, 103.0, 92.0, 102.0),
            bar(1, 102.0, 104.0, 101.0, 103.0),
            bar(2, 103.0, 104.0, 90.0, 91.0),
        ];
        let full = m5().classify(&bars);
        let head = m5().classify(&bars[..2]);
        assert_eq!(&full[..2], head.as_slice());
    }
}
