use ndarray::{s, Array2};

use crate::frame::PixelGrid;

/// Remove `margin` pixels from every edge.
///
/// Grids too small to keep at least one pixel are returned unchanged.
pub fn crop_edges(data: &PixelGrid, margin: usize) -> PixelGrid {
    let (h, w) = data.dim();
    if margin == 0 || h <= 2 * margin || w <= 2 * margin {
        return data.clone();
    }
    data.slice(s![margin..h - margin, margin..w - margin]).to_owned()
}

/// Downscale by averaging `factor`x`factor` blocks.
///
/// Blocks overhanging the right or bottom edge average only the pixels
/// they contain.
pub fn downscale_mean(data: &PixelGrid, factor: usize) -> PixelGrid {
    if factor <= 1 {
        return data.clone();
    }
    let (h, w) = data.dim();
    let new_h = h.div_ceil(factor);
    let new_w = w.div_ceil(factor);
    let mut result = Array2::<f64>::zeros((new_h, new_w));

    for r in 0..new_h {
        for c in 0..new_w {
            let block = data.slice(s![
                r * factor..((r + 1) * factor).min(h),
                c * factor..((c + 1) * factor).min(w)
            ]);
            result[[r, c]] = block.sum() / block.len() as f64;
        }
    }

    result
}
