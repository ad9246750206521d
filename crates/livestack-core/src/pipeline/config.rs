use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_DEQUEUE_TIMEOUT_MS, DEFAULT_PREVIEW_CROP, DEFAULT_PREVIEW_DOWNSCALE,
    DEFAULT_SMOOTHING_SIGMA, DEFAULT_STRETCH_SHADOWS_CLIP, DEFAULT_STRETCH_TARGET_BACKGROUND,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding stack files and the processed ledger.
    pub storage_dir: PathBuf,
    /// Directory receiving preview PNGs.
    pub output_dir: PathBuf,
    /// How long the worker waits for a queued path before re-checking
    /// its stop flag.
    #[serde(default = "default_dequeue_timeout_ms")]
    pub dequeue_timeout_ms: u64,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl PipelineConfig {
    pub fn new(storage_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            output_dir: output_dir.into(),
            dequeue_timeout_ms: DEFAULT_DEQUEUE_TIMEOUT_MS,
            smoothing: SmoothingConfig::default(),
            preview: PreviewConfig::default(),
        }
    }

    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms.max(1))
    }
}

fn default_dequeue_timeout_ms() -> u64 {
    DEFAULT_DEQUEUE_TIMEOUT_MS
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Gaussian sigma applied to dark and flat frames before merging.
    pub sigma: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_SMOOTHING_SIGMA,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Pixels removed from each edge before stretching.
    pub crop: usize,
    /// Block-mean downscale factor in both axes.
    pub downscale: usize,
    /// Level the stretch maps the background median onto (0.0..1.0).
    pub target_background: f64,
    /// Shadow clipping point in average deviations from the median.
    pub shadows_clip: f64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            crop: DEFAULT_PREVIEW_CROP,
            downscale: DEFAULT_PREVIEW_DOWNSCALE,
            target_background: DEFAULT_STRETCH_TARGET_BACKGROUND,
            shadows_clip: DEFAULT_STRETCH_SHADOWS_CLIP,
        }
    }
}
