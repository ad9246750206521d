use ndarray::{Array2, Axis};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::frame::PixelGrid;

/// Apply Gaussian blur to a pixel grid using separable 1D convolution.
///
/// Samples beyond the edge repeat the nearest edge pixel. A non-positive
/// sigma returns the input unchanged.
pub fn gaussian_blur_array(data: &PixelGrid, sigma: f64) -> PixelGrid {
    if sigma <= 0.0 || data.is_empty() {
        return data.clone();
    }
    let kernel = make_gaussian_kernel(sigma);
    let row_pass = convolve(data, &kernel, Direction::Rows);
    convolve(&row_pass, &kernel, Direction::Cols)
}

fn make_gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (sigma * 3.0).ceil() as usize;
    let size = 2 * radius + 1;
    let mut kernel = vec![0.0f64; size];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f64;

    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f64 - radius as f64;
        *k = (-x * x / s2).exp();
        sum += *k;
    }

    for v in &mut kernel {
        *v /= sum;
    }

    kernel
}

#[derive(Clone, Copy)]
enum Direction {
    Rows,
    Cols,
}

fn convolve(data: &PixelGrid, kernel: &[f64], direction: Direction) -> PixelGrid {
    let (h, w) = data.dim();
    let radius = kernel.len() as isize / 2;

    let sample_at = |row: usize, col: usize| -> f64 {
        kernel
            .iter()
            .enumerate()
            .map(|(ki, &kv)| {
                let delta = ki as isize - radius;
                let value = match direction {
                    Direction::Rows => {
                        data[[row, (col as isize + delta).clamp(0, w as isize - 1) as usize]]
                    }
                    Direction::Cols => {
                        data[[(row as isize + delta).clamp(0, h as isize - 1) as usize, col]]
                    }
                };
                value * kv
            })
            .sum()
    };

    let mut result = Array2::<f64>::zeros((h, w));
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        result
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(row, mut out)| {
                for col in 0..w {
                    out[col] = sample_at(row, col);
                }
            });
    } else {
        for row in 0..h {
            for col in 0..w {
                result[[row, col]] = sample_at(row, col);
            }
        }
    }
    result
}
