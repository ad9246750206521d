pub mod gaussian_blur;
pub mod resample;
pub mod stretch;

use crate::consts::DEFAULT_SMOOTHING_SIGMA;
use crate::frame::PixelGrid;

pub use gaussian_blur::gaussian_blur_array;

/// Noise-suppressing low-pass filter applied to calibration frames before
/// they are merged. Output has the same shape as the input.
pub trait Smoother: Send + Sync {
    fn smooth(&self, data: &PixelGrid) -> PixelGrid;
}

/// Separable Gaussian blur with nearest-edge handling.
#[derive(Clone, Copy, Debug)]
pub struct GaussianSmoother {
    pub sigma: f64,
}

impl Default for GaussianSmoother {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_SMOOTHING_SIGMA,
        }
    }
}

impl Smoother for GaussianSmoother {
    fn smooth(&self, data: &PixelGrid) -> PixelGrid {
        gaussian_blur_array(data, self.sigma)
    }
}
