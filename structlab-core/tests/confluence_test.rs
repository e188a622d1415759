//! Confluence scorer and entry gating on a realistic series.

use chrono::{TimeZone, Utc};
use structlab_core::confluence::{
    self, ConfluenceParams, EntryFilter, HtfRegime, ScoringContext, SetupGrade, StructurePolicy,
};
use structlab_core::domain::{Bar, BarSeries, Bias, Timeframe};
use structlab_core::patterns::{GeometricClassifier, PatternClassifier, PatternCode};
use structlab_core::structure::{detect, StructureOutput, SwingParams};

fn make_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
    let mut price: f64 = 1950.0;
    (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let leg = if (i / 15) % 2 == 0 { 0.8 } else { -0.8 };
            let change = ((seed >> 33) % 100) as f64 * 0.06 - 3.0 + leg;
            let open = price;
            price = (price + change).max(100.0);
            let close = price;
            Bar {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 0.5 + (seed % 11) as f64 * 0.2,
                low: open.min(close) - 0.5 - (seed % 13) as f64 * 0.2,
                close,
                volume: 1000.0 + ((seed >> 17) % 1500) as f64,
                spread: Some(0.25 + ((seed >> 9) % 8) as f64 * 0.05),
            }
        })
        .collect()
}

struct Fixture {
    series: BarSeries,
    structure: StructureOutput,
    patterns: Vec<PatternCode>,
}

fn fixture(n: usize) -> Fixture {
    let series = BarSeries::new(make_bars(n)).unwrap();
    let structure = detect(&series, &SwingParams::for_timeframe(Timeframe::H1));
    let patterns = GeometricClassifier::for_timeframe(Timeframe::H1).classify(series.bars());
    Fixture {
        series,
        structure,
        patterns,
    }
}

fn h1_params() -> ConfluenceParams {
    ConfluenceParams::for_timeframe(Timeframe::H1)
}

#[test]
fn scores_are_bounded_and_match_flags() {
    let f = fixture(400);
    let out = confluence::score(&f.series, &f.structure, &f.patterns, &h1_params());
    assert_eq!(out.vectors.len(), 400);
    for v in &out.vectors {
        assert!(v.primary_score <= 4);
        assert!(v.secondary_score <= 5);
        let rebuilt = confluence::ConfluenceVector::from_flags(
            v.conf_structure,
            v.conf_bos_or_choch,
            v.conf_candle,
            v.conf_sr_zone,
            v.conf_psych_level,
            v.conf_fib_zone,
            v.conf_volume,
            v.conf_liquidity,
            v.conf_spread,
        );
        assert_eq!(*v, rebuilt);
        // Strict structure implies an event on the same bar
        if v.conf_structure {
            assert!(v.conf_bos_or_choch);
        }
    }
}

#[test]
fn single_bar_scoring_matches_batch() {
    let f = fixture(250);
    let params = h1_params();
    let batch = confluence::score(&f.series, &f.structure, &f.patterns, &params);
    for i in [0, 1, 13, 99, 200, 249] {
        let v = confluence::score_bar(&f.series, &f.structure, &f.patterns, &params, i);
        assert_eq!(v, batch.vectors[i], "bar {i}");
    }

    let ctx = ScoringContext::new(&f.series, &f.structure, &f.patterns, &params);
    assert_eq!(ctx.score_bar(42), ctx.score_bar(42));
}

#[test]
fn regime_series_matches_scored_regime() {
    let f = fixture(300);
    let params = h1_params();
    let scored = confluence::score(&f.series, &f.structure, &f.patterns, &params);
    assert_eq!(
        confluence::regime_series(&f.series, &f.structure, &params),
        scored.regime
    );
}

#[test]
fn loose_structure_flags_a_superset_of_strict() {
    let f = fixture(300);
    let strict = confluence::score(&f.series, &f.structure, &f.patterns, &h1_params());
    let loose_params = ConfluenceParams {
        structure_policy: StructurePolicy::Loose,
        ..h1_params()
    };
    let loose = confluence::score(&f.series, &f.structure, &f.patterns, &loose_params);
    for (s, l) in strict.vectors.iter().zip(&loose.vectors) {
        if s.conf_structure {
            assert!(l.conf_structure);
        }
    }
    let count = |vs: &[confluence::ConfluenceVector]| vs.iter().filter(|v| v.conf_structure).count();
    assert!(count(&loose.vectors) >= count(&strict.vectors));
}

#[test]
fn grades_follow_primary_score() {
    let f = fixture(300);
    let out = confluence::score(&f.series, &f.structure, &f.patterns, &h1_params());
    for v in &out.vectors {
        let expected = match v.primary_score {
            4 => SetupGrade::APlus,
            3 => SetupGrade::A,
            2 => SetupGrade::B,
            _ => SetupGrade::C,
        };
        assert_eq!(v.setup_grade(), expected);
    }
}

// ── Gating ──

#[test]
fn candidates_satisfy_the_filter() {
    let f = fixture(400);
    let scored = confluence::score(&f.series, &f.structure, &f.patterns, &h1_params());
    let filter = EntryFilter::for_timeframe(Timeframe::H1);
    let candidates = filter.candidates(&f.series, &scored, None);
    let mut last = None;
    for c in &candidates {
        assert!(filter.passes_scores(&c.vector));
        assert_eq!(c.bias, scored.regime[c.index]);
        assert!(last.map_or(true, |l| c.index > l));
        last = Some(c.index);
    }
}

#[test]
fn htf_regime_only_removes_candidates() {
    let f = fixture(400);
    let scored = confluence::score(&f.series, &f.structure, &f.patterns, &h1_params());
    let filter = EntryFilter {
        min_primary: 1,
        min_secondary: None,
        min_confs: None,
        require_regime_match: true,
    };
    let open = filter.candidates(&f.series, &scored, None);

    let start = f.series.bars()[0].timestamp - chrono::Duration::days(1);
    let htf: HtfRegime = [(start, Bias::Bear)].into_iter().collect();
    let gated = filter.candidates(&f.series, &scored, Some(&htf));

    assert!(gated.len() <= open.len());
    assert!(gated.iter().all(|c| c.bias == Bias::Bear));
    assert!(gated.iter().all(|c| open.contains(c)));
    let open_bear = open.iter().filter(|c| c.bias == Bias::Bear).count();
    assert_eq!(gated.len(), open_bear);
}

#[test]
fn htf_not_yet_known_blocks_everything() {
    let f = fixture(120);
    let scored = confluence::score(&f.series, &f.structure, &f.patterns, &h1_params());
    let filter = EntryFilter {
        min_primary: 0,
        min_secondary: None,
        min_confs: None,
        require_regime_match: true,
    };
    let after_end = f.series.bars()[119].timestamp + chrono::Duration::hours(1);
    let htf: HtfRegime = [(after_end, Bias::Bull)].into_iter().collect();
    assert!(filter.candidates(&f.series, &scored, Some(&htf)).is_empty());
    assert_eq!(filter.candidates(&f.series, &scored, None).len(), 120);
}
