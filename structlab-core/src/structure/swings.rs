//! Swing extraction: single forward pass over a symmetric window.

use crate::domain::{Bar, SwingKind, SwingPoint};

/// Find swing highs and lows.
///
/// Index `i` in `[w, n - w)` is a swing-high when `high[i]` equals the max of
/// `high[i-w ..= i+w]` and the previous accepted swing-high is at least
/// `min_swing_dist` bars earlier. Swing-lows mirror this on `low`. Equal
/// extremes inside one window collapse to the earliest index because the
/// later one fails the spacing rule.
///
/// Output is ordered by index; when one bar is both a swing-high and a
/// swing-low the high comes first.
pub fn extract_swings(bars: &[Bar], swing_window: usize, min_swing_dist: usize) -> Vec<SwingPoint> {
    let n = bars.len();
    let w = swing_window;
    let mut swings = Vec::new();

    if n < 2 * w + 1 {
        return swings;
    }

    let mut last_high: Option<usize> = None;
    let mut last_low: Option<usize> = None;

    for i in w..n - w {
        let window = &bars[i - w..=i + w];
        let hi = bars[i].high;
        let lo = bars[i].low;

        let is_max = window.iter().all(|b| b.high <= hi);
        if is_max && last_high.map_or(true, |j| i - j >= min_swing_dist) {
            swings.push(SwingPoint {
                index: i,
                price: hi,
                kind: SwingKind::High,
            });
            last_high = Some(i);
        }

        let is_min = window.iter().all(|b| b.low >= lo);
        if is_min && last_low.map_or(true, |j| i - j >= min_swing_dist) {
            swings.push(SwingPoint {
                index: i,
                price: lo,
                kind: SwingKind::Low,
            });
            last_low = Some(i);
        }
    }

    swings
}
