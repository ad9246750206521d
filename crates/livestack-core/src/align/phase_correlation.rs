use ndarray::{Array2, Zip};
use num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{LiveStackError, Result};
use crate::frame::PixelGrid;

/// Translation of a target image relative to a reference.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

/// Estimate the translation between two equally sized grids using FFT
/// phase correlation with paraboloid subpixel refinement.
///
/// Passing the result to [`shift`] together with `target` maps `target`
/// onto the reference's pixel grid.
pub fn compute_offset(reference: &PixelGrid, target: &PixelGrid) -> Result<Offset> {
    if reference.dim() != target.dim() {
        return Err(LiveStackError::ShapeMismatch {
            expected: reference.dim(),
            actual: target.dim(),
        });
    }
    let (h, w) = reference.dim();

    let ref_fft = fft2d(&apply_hann(reference), false);
    let tgt_fft = fft2d(&apply_hann(target), false);

    let mut cross_power = Array2::<Complex<f64>>::zeros((h, w));
    Zip::from(&mut cross_power)
        .and(&ref_fft)
        .and(&tgt_fft)
        .for_each(|out, &r, &t| {
            let cross = r * t.conj();
            let mag = cross.norm();
            *out = if mag > 1e-12 { cross / mag } else { Complex::new(0.0, 0.0) };
        });

    let correlation = fft2d(&cross_power, true).mapv(|c| c.re);
    let (peak_row, peak_col) = find_peak(&correlation);

    // Peaks past the midpoint are negative shifts wrapped around.
    let dy = if peak_row > h / 2 {
        peak_row as f64 - h as f64
    } else {
        peak_row as f64
    };
    let dx = if peak_col > w / 2 {
        peak_col as f64 - w as f64
    } else {
        peak_col as f64
    };

    let (sub_dy, sub_dx) = refine_peak(&correlation, peak_row, peak_col);

    Ok(Offset {
        dx: dx + sub_dx,
        dy: dy + sub_dy,
    })
}

/// Resample `data` shifted by `offset` with bilinear interpolation.
/// Destination pixels that map outside the source are zero.
pub fn shift(data: &PixelGrid, offset: Offset) -> PixelGrid {
    Array2::from_shape_fn(data.dim(), |(row, col)| {
        bilinear_sample(data, row as f64 - offset.dy, col as f64 - offset.dx)
    })
}

pub fn bilinear_sample(data: &PixelGrid, y: f64, x: f64) -> f64 {
    let (h, w) = data.dim();

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let sample = |r: i64, c: i64| -> f64 {
        if r >= 0 && r < h as i64 && c >= 0 && c < w as i64 {
            data[[r as usize, c as usize]]
        } else {
            0.0
        }
    };

    sample(y0, x0) * (1.0 - fx) * (1.0 - fy)
        + sample(y0, x0 + 1) * fx * (1.0 - fy)
        + sample(y0 + 1, x0) * (1.0 - fx) * fy
        + sample(y0 + 1, x0 + 1) * fx * fy
}

fn apply_hann(data: &PixelGrid) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let hann = |i: usize, n: usize| 0.5 * (1.0 - (std::f64::consts::TAU * i as f64 / n as f64).cos());
    Array2::from_shape_fn((h, w), |(row, col)| {
        let v = data[[row, col]];
        let v = if v.is_finite() { v } else { 0.0 };
        Complex::new(v * hann(row, h) * hann(col, w), 0.0)
    })
}

/// Separable 2D FFT over rows then columns. The inverse is normalised.
fn fft2d(data: &Array2<Complex<f64>>, inverse: bool) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::<f64>::new();
    let (fft_row, fft_col) = if inverse {
        (planner.plan_fft_inverse(w), planner.plan_fft_inverse(h))
    } else {
        (planner.plan_fft_forward(w), planner.plan_fft_forward(h))
    };

    let mut work = data.clone();
    let mut buffer = Vec::with_capacity(w.max(h));

    for mut row in work.rows_mut() {
        buffer.clear();
        buffer.extend(row.iter().copied());
        fft_row.process(&mut buffer);
        row.iter_mut().zip(&buffer).for_each(|(dst, &src)| *dst = src);
    }

    for mut col in work.columns_mut() {
        buffer.clear();
        buffer.extend(col.iter().copied());
        fft_col.process(&mut buffer);
        col.iter_mut().zip(&buffer).for_each(|(dst, &src)| *dst = src);
    }

    if inverse {
        let scale = 1.0 / (h * w) as f64;
        work.mapv_inplace(|c| c * scale);
    }
    work
}

fn find_peak(data: &Array2<f64>) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_val = f64::NEG_INFINITY;
    for ((row, col), &v) in data.indexed_iter() {
        if v > best_val {
            best_val = v;
            best = (row, col);
        }
    }
    best
}

/// Fit a parabola through the peak and its neighbours along each axis.
/// Returns (delta_row, delta_col), clamped to half a pixel.
fn refine_peak(correlation: &Array2<f64>, peak_row: usize, peak_col: usize) -> (f64, f64) {
    let (h, w) = correlation.dim();
    if peak_row == 0 || peak_row + 1 >= h || peak_col == 0 || peak_col + 1 >= w {
        return (0.0, 0.0);
    }

    let vertex = |prev: f64, curr: f64, next: f64| {
        let curvature = prev - 2.0 * curr + next;
        if curvature.abs() > 1e-12 {
            ((prev - next) / (2.0 * curvature)).clamp(-0.5, 0.5)
        } else {
            0.0
        }
    };

    let centre = correlation[[peak_row, peak_col]];
    (
        vertex(
            correlation[[peak_row - 1, peak_col]],
            centre,
            correlation[[peak_row + 1, peak_col]],
        ),
        vertex(
            correlation[[peak_row, peak_col - 1]],
            centre,
            correlation[[peak_row, peak_col + 1]],
        ),
    )
}
