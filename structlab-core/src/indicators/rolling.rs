//! Causal rolling statistics.
//!
//! Every function here looks at the trailing window `[i + 1 - window, i]`
//! (clipped at 0), so the first bars use a shorter window rather than NaN.
//! NaN inputs are skipped; a window with no finite values yields NaN.

/// Trailing mean over `window` values, current value included.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut result = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    let mut count = 0usize;

    for i in 0..values.len() {
        let v = values[i];
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
        if i >= window {
            let old = values[i - window];
            if !old.is_nan() {
                sum -= old;
                count -= 1;
            }
        }
        result.push(if count == 0 { f64::NAN } else { sum / count as f64 });
    }

    result
}

/// Trailing maximum over `window` values, current value included.
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_fold(values, window, f64::max)
}

/// Trailing minimum over `window` values, current value included.
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_fold(values, window, f64::min)
}

fn rolling_fold(values: &[f64], window: usize, f: fn(f64, f64) -> f64) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            values[start..=i]
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .reduce(f)
                .unwrap_or(f64::NAN)
        })
        .collect()
}

/// Trailing quantile over `window` values with linear interpolation between
/// order statistics. `q` is clamped to [0, 1].
pub fn rolling_quantile(values: &[f64], window: usize, q: f64) -> Vec<f64> {
    let window = window.max(1);
    let q = q.clamp(0.0, 1.0);
    let mut scratch: Vec<f64> = Vec::with_capacity(window);

    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            scratch.clear();
            scratch.extend(values[start..=i].iter().copied().filter(|v| !v.is_nan()));
            quantile_of(&mut scratch, q)
        })
        .collect()
}

fn quantile_of(window: &mut [f64], q: f64) -> f64 {
    if window.is_empty() {
        return f64::NAN;
    }
    window.sort_by(|a, b| a.total_cmp(b));
    let pos = q * (window.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    window[lo] + (window[hi] - window[lo]) * frac
}
