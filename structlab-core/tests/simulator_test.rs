//! Simulator scenarios: clean wins and losses, horizon timeouts, the
//! intrabar tie-break and breakeven arming.

use chrono::{TimeZone, Utc};
use structlab_core::domain::{Bar, BarSeries, ExitReason, Outcome, Side};
use structlab_core::risk::TradePlan;
use structlab_core::simulator::{simulate, IntrabarPolicy, PlannedSignal, SimConfig};

fn series(hlc: &[(f64, f64, f64)]) -> BarSeries {
    let base = Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap();
    let bars = hlc
        .iter()
        .enumerate()
        .map(|(i, &(high, low, close))| Bar {
            timestamp: base + chrono::Duration::hours(i as i64),
            open: close,
            high,
            low,
            close,
            volume: 500.0,
            spread: None,
        })
        .collect();
    BarSeries::new(bars).unwrap()
}

fn plan(side: Side, entry: f64, stop: f64, target: f64) -> TradePlan {
    TradePlan {
        side,
        entry_price: entry,
        stop_loss: stop,
        take_profit: target,
        lot_size: 0.5,
        breakeven_trigger: entry + 0.7 * (target - entry),
        risk_pct: 0.005,
        risk_amount: 50.0,
        stop_pips: (entry - stop).abs() / 0.1,
        warnings: Vec::new(),
    }
}

fn run(s: &BarSeries, p: TradePlan, config: &SimConfig) -> Vec<structlab_core::domain::TradeRecord> {
    simulate(s, &[PlannedSignal { index: 0, plan: p }], config)
}

fn horizon(h: usize) -> SimConfig {
    SimConfig {
        horizon: h,
        ..SimConfig::default()
    }
}

#[test]
fn monotonic_rise_to_target_is_win() {
    let s = series(&[
        (100.5, 99.5, 100.0),
        (101.5, 100.2, 101.0),
        (102.5, 101.2, 102.0),
        (103.5, 102.2, 103.0),
        (105.0, 103.2, 104.5),
    ]);
    let trades = run(&s, plan(Side::Long, 100.0, 98.0, 104.0), &horizon(150));
    assert_eq!(trades.len(), 1);
    let t = &trades[0];
    assert_eq!(t.outcome, Outcome::Win);
    assert_eq!(t.exit_reason, ExitReason::TakeProfit);
    assert_eq!(t.exit_index, 4);
    assert_eq!(t.exit_price, 104.0);
    assert!((t.reward_r - 2.0).abs() < 1e-9);
    // 4.0 price = 40 pips * $10 * 0.5 lots
    assert!((t.reward - 200.0).abs() < 1e-6);
}

#[test]
fn monotonic_fall_to_stop_is_loss() {
    let s = series(&[
        (100.5, 99.5, 100.0),
        (100.0, 99.0, 99.2),
        (99.5, 97.5, 97.8),
    ]);
    let t = &run(&s, plan(Side::Long, 100.0, 98.0, 104.0), &horizon(150))[0];
    assert_eq!(t.outcome, Outcome::Loss);
    assert_eq!(t.exit_reason, ExitReason::StopLoss);
    assert_eq!(t.exit_price, 98.0);
    assert!((t.reward_r + 1.0).abs() < 1e-9);
    assert!((t.mae + 2.5).abs() < 1e-9);
}

#[test]
fn flat_series_times_out_at_horizon_close() {
    let s = series(&[(100.5, 99.5, 100.0); 20]);
    let t = &run(&s, plan(Side::Long, 100.0, 98.0, 104.0), &horizon(10))[0];
    assert_eq!(t.outcome, Outcome::Timeout);
    assert_eq!(t.exit_reason, ExitReason::Horizon);
    assert_eq!(t.exit_index, 10);
    assert_eq!(t.bars_held, 10);
    assert_eq!(t.exit_price, 100.0);
}

#[test]
fn horizon_is_clipped_to_series_end() {
    let s = series(&[(100.5, 99.5, 100.0); 4]);
    let t = &run(&s, plan(Side::Long, 100.0, 98.0, 104.0), &horizon(150))[0];
    assert_eq!(t.outcome, Outcome::Timeout);
    assert_eq!(t.exit_index, 3);
}

#[test]
fn documented_tie_break_example_resolves_to_loss_at_stop() {
    // high = [101, 103, 105], low = [99, 98, 97]; entry 100, stop 98, target 104
    let s = series(&[(101.0, 99.0, 100.0), (103.0, 98.0, 102.0), (105.0, 97.0, 100.0)]);
    let t = &run(&s, plan(Side::Long, 100.0, 98.0, 104.0), &horizon(3))[0];
    // Bar 1 touches the stop (low 98) without reaching the target, so no
    // same-bar tie-break applies; that case is bar_spanning_both_levels_follows_intrabar_policy
    assert_eq!(t.outcome, Outcome::Loss);
    assert_eq!(t.exit_index, 1);
    assert_eq!(t.exit_price, 98.0);
    assert_ne!(t.outcome, Outcome::Win);
}

#[test]
fn bar_spanning_both_levels_follows_intrabar_policy() {
    let s = series(&[(101.0, 99.0, 100.0), (103.0, 99.0, 102.0), (105.0, 97.0, 100.0)]);
    let p = plan(Side::Long, 100.0, 98.0, 104.0);

    let pessimistic = &run(&s, p.clone(), &horizon(3))[0];
    assert_eq!(pessimistic.exit_index, 2);
    assert_eq!(pessimistic.outcome, Outcome::Loss);

    let optimistic = SimConfig {
        intrabar: IntrabarPolicy::TargetFirst,
        ..horizon(3)
    };
    let t = &run(&s, p, &optimistic)[0];
    assert_eq!(t.exit_index, 2);
    assert_eq!(t.outcome, Outcome::Win);
}

#[test]
fn short_trade_mirrors_levels() {
    let s = series(&[(100.5, 99.5, 100.0), (100.2, 98.5, 98.8), (99.0, 95.5, 96.0)]);
    let t = &run(&s, plan(Side::Short, 100.0, 102.0, 96.0), &horizon(150))[0];
    assert_eq!(t.side, Side::Short);
    assert_eq!(t.outcome, Outcome::Win);
    assert_eq!(t.exit_price, 96.0);
    assert!(t.reward > 0.0);
}

#[test]
fn breakeven_arms_before_levels_on_same_bar() {
    // Bar 1 reaches the trigger (102.8) and dips back to 99.5: with breakeven
    // the stop is already at 100 on that bar.
    let s = series(&[(100.5, 99.5, 100.0), (103.0, 99.5, 100.0), (100.5, 99.5, 100.0)]);
    let p = plan(Side::Long, 100.0, 98.0, 104.0);

    let without = &run(&s, p.clone(), &horizon(2))[0];
    assert_eq!(without.outcome, Outcome::Timeout);

    let with = SimConfig {
        breakeven: true,
        fee_per_trade: 1.0,
        ..horizon(2)
    };
    let t = &run(&s, p, &with)[0];
    assert_eq!(t.exit_reason, ExitReason::BreakevenStop);
    assert_eq!(t.outcome, Outcome::Loss);
    assert_eq!(t.exit_index, 1);
    assert_eq!(t.exit_price, 100.0);
    assert!((t.reward + 1.0).abs() < 1e-9);
}

#[test]
fn replay_is_deterministic() {
    let s = series(&[
        (100.5, 99.5, 100.0),
        (101.5, 99.0, 101.0),
        (102.5, 100.0, 101.5),
        (101.0, 97.5, 98.0),
    ]);
    let signals = vec![
        PlannedSignal {
            index: 0,
            plan: plan(Side::Long, 100.0, 98.0, 104.0),
        },
        PlannedSignal {
            index: 2,
            plan: plan(Side::Short, 101.5, 103.5, 97.5),
        },
    ];
    let a = simulate(&s, &signals, &SimConfig::default());
    let b = simulate(&s, &signals, &SimConfig::default());
    assert_eq!(a, b);
    assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
}
