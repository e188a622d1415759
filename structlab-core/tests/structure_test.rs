//! Structure detector integration tests: swing examples, trend coverage and
//! event exclusivity on realistic series.

use chrono::{TimeZone, Utc};
use structlab_core::domain::{Bar, BarSeries, Bias, Direction, StructureEvent, SwingKind};
use structlab_core::structure::{detect, extract_swings, SwingParams};

fn bar(i: usize, high: f64, low: f64) -> Bar {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    Bar {
        timestamp: base + chrono::Duration::minutes(5 * i as i64),
        open: (high + low) / 2.0,
        high,
        low,
        close: (high + low) / 2.0,
        volume: 100.0,
        spread: None,
    }
}

fn series_from_highs(highs: &[f64]) -> BarSeries {
    let bars = highs.iter().enumerate().map(|(i, &h)| bar(i, h, 50.0)).collect();
    BarSeries::new(bars).unwrap()
}

/// Deterministic zig-zag with drift; produces plenty of swings both ways.
fn zigzag(n: usize) -> BarSeries {
    let mut price: f64 = 2000.0;
    let bars = (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let step = ((seed >> 33) % 200) as f64 / 20.0 - 5.0;
            let leg = if (i / 12) % 2 == 0 { 1.5 } else { -1.5 };
            price = (price + step + leg).max(100.0);
            bar(i, price + 2.0, price - 2.0)
        })
        .collect();
    BarSeries::new(bars).unwrap()
}

// ── Swing examples ──

#[test]
fn isolated_spike_is_exactly_one_swing_high() {
    let series = series_from_highs(&[100.0, 101.0, 102.0, 110.0, 102.0, 101.0, 100.0]);
    let swings = extract_swings(series.bars(), 3, 3);
    let highs: Vec<_> = swings.iter().filter(|s| s.kind == SwingKind::High).collect();
    assert_eq!(highs.len(), 1);
    assert_eq!(highs[0].index, 3);
    assert_eq!(highs[0].price, 110.0);
}

#[test]
fn two_spikes_two_bars_apart_collapse_to_first() {
    let series = series_from_highs(&[
        100.0, 100.0, 100.0, 110.0, 100.0, 110.0, 100.0, 100.0, 100.0,
    ]);
    let swings = extract_swings(series.bars(), 3, 3);
    let highs: Vec<usize> = swings
        .iter()
        .filter(|s| s.kind == SwingKind::High)
        .map(|s| s.index)
        .collect();
    assert_eq!(highs, vec![3]);
}

// ── Trend and events ──

#[test]
fn one_trend_value_per_bar() {
    for n in [0, 1, 6, 7, 50, 400] {
        let series = zigzag(n);
        let out = detect(&series, &SwingParams::new(3, 3));
        assert_eq!(out.trend.len(), n, "n = {n}");
        if n >= 7 {
            assert_eq!(out.events.len(), n);
        } else {
            assert!(out.events.is_empty());
        }
    }
}

#[test]
fn never_both_bos_and_choch() {
    let series = zigzag(600);
    let out = detect(&series, &SwingParams::new(3, 3));
    assert!(out.swings.len() > 10, "fixture should produce swings");
    for e in &out.events {
        assert!(!(e.bos.is_some() && e.choch.is_some()));
    }
}

#[test]
fn trend_changes_only_on_choch() {
    let series = zigzag(600);
    let out = detect(&series, &SwingParams::new(3, 3));
    let mut prev = out.params.initial_bias;
    for (i, bias) in out.trend.iter().enumerate() {
        if *bias != prev {
            let expected = match bias {
                Bias::Bull => Direction::Up,
                Bias::Bear => Direction::Down,
            };
            assert_eq!(out.events[i].choch, Some(expected), "flip at {i} without CHoCH");
        }
        prev = *bias;
    }
}

#[test]
fn bos_only_in_direction_of_bias() {
    let series = zigzag(600);
    let out = detect(&series, &SwingParams::new(4, 4));
    for (i, e) in out.events.iter().enumerate() {
        match e.bos {
            Some(Direction::Up) => assert_eq!(out.trend[i], Bias::Bull),
            Some(Direction::Down) => assert_eq!(out.trend[i], Bias::Bear),
            None => {}
        }
    }
}

#[test]
fn bear_start_flips_on_higher_high() {
    // w = 1: swing highs at 1 (105) and 4 (108)
    let series = BarSeries::new(vec![
        bar(0, 100.0, 95.0),
        bar(1, 105.0, 96.0),
        bar(2, 101.0, 96.0),
        bar(3, 102.0, 97.0),
        bar(4, 108.0, 98.0),
        bar(5, 103.0, 99.0),
    ])
    .unwrap();
    let params = SwingParams::new(1, 1).with_initial_bias(Bias::Bear);
    let out = detect(&series, &params);
    assert_eq!(out.event_at(4), StructureEvent::choch(Direction::Up));
    assert_eq!(out.trend[3], Bias::Bear);
    assert_eq!(out.trend[4], Bias::Bull);
}

#[test]
fn detection_is_deterministic() {
    let series = zigzag(300);
    let params = SwingParams::new(5, 5);
    assert_eq!(detect(&series, &params), detect(&series, &params));
}
