use crate::consts::EPSILON;
use crate::frame::PixelGrid;

/// Linearly remap the finite value range onto [0.0, 1.0].
///
/// A constant grid maps to zero; non-finite samples map to zero.
pub fn normalize(data: &PixelGrid) -> PixelGrid {
    let (min, max) = data
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if !range.is_finite() || range < EPSILON {
        return data.mapv(|_| 0.0);
    }
    data.mapv(|v| {
        if v.is_finite() {
            ((v - min) / range).clamp(0.0, 1.0)
        } else {
            0.0
        }
    })
}

/// Midtones transfer function with balance `m`; maps 0 -> 0, m -> 0.5, 1 -> 1.
pub fn midtones_transfer(m: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let denominator = (2.0 * m - 1.0) * x - m;
    if denominator.abs() < EPSILON {
        return 0.5;
    }
    (m - 1.0) * x / denominator
}

/// Automatic display stretch.
///
/// Normalises to [0, 1], clips shadows at `shadows_clip` average deviations
/// from the median, then applies the midtones transfer that moves the
/// median onto `target_background`.
pub fn auto_stretch(data: &PixelGrid, target_background: f64, shadows_clip: f64) -> PixelGrid {
    if data.is_empty() {
        return data.clone();
    }
    let unit = normalize(data);

    let median = median(unit.iter().copied().collect());
    let avg_dev = unit.iter().map(|v| (v - median).abs()).sum::<f64>() / unit.len() as f64;

    let shadows = (median + shadows_clip * avg_dev).clamp(0.0, 1.0);
    let balance = midtones_transfer(target_background, median - shadows);
    let span = 1.0 - shadows;

    unit.mapv(|v| {
        if v < shadows || span < EPSILON {
            0.0
        } else {
            midtones_transfer(balance, (v - shadows) / span)
        }
    })
}

fn median(mut values: Vec<f64>) -> f64 {
    let n = values.len();
    let mid = n / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;
    if n % 2 == 0 {
        let below = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (below + upper) / 2.0
    } else {
        upper
    }
}
